//! State module for tracking per-URL progress
//!
//! # Components
//!
//! - `ScrapeStatus`: The durable lifecycle of a URL (pending, completed, failed)

mod scrape_status;

pub use scrape_status::ScrapeStatus;
