//! Crawler module for page fetching and processing
//!
//! This module contains the core pipeline, including:
//! - Page rendering and image downloads behind the `PageRenderer` trait
//! - Bounded retry with exponential backoff and jitter
//! - Per-host rate limiting
//! - Visible text and image extraction from HTML
//! - Session orchestration and result aggregation

mod error;
mod fetcher;
mod parser;
mod rate_limiter;
mod renderer;
mod retry;
mod session;

pub use error::{default_fetch_policy, FetchError};
pub use fetcher::{decode_data_url, FetchEngine, FetchedPage};
pub use parser::{collapse_whitespace, parse_page, ParsedPage};
pub use rate_limiter::RateLimiter;
pub use renderer::{build_http_client, HttpRenderer, PageRenderer, RenderedPage};
pub use retry::{ErrorClass, RetryController, RetryError, RetryPolicy};
pub use session::{Capabilities, ScrapeAttemptResult, Session};
