//! Configuration module for Pagesift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; an empty file yields the defaults.
//!
//! # Example
//!
//! ```no_run
//! use pagesift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagesift.toml")).unwrap();
//! println!("Pages get {} retries", config.retry.page.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ImageRetryConfig, OcrConfig, OutputConfig, PageRetryConfig, RateLimitConfig,
    RetryConfig, ScrapeConfig, ScrapeMode, TrackingConfig, UserAgentConfig,
};

pub use parser::{load_config, parse_config};
pub use validation::validate;
