//! Pagesift: a paced page fetcher with image text extraction
//!
//! This crate fetches a list of web pages, extracts their visible text and images,
//! classifies the text found in each image, and persists everything to a
//! deterministic directory layout. An optional SQLite-backed tracker records the
//! lifecycle of every URL so that repeated runs skip work that already completed.

pub mod config;
pub mod crawler;
pub mod ocr;
pub mod output;
pub mod source;
pub mod state;
pub mod storage;
pub mod url;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for Pagesift operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No URLs to process: {0}")]
    NoTargets(String),

    #[error("Invalid URL source: {0}")]
    Source(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("URL exceeds {max} characters ({len})")]
    TooLong { len: usize, max: usize },

    #[error("URL contains invalid character {0:?}")]
    InvalidCharacter(char),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Pagesift operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, ScrapeMode};
pub use crawler::{Capabilities, Session};
pub use ocr::{ImageOutcome, OcrStatus};
pub use output::RunSummary;
pub use source::{TargetUrl, UrlSource};
pub use state::ScrapeStatus;

/// Runs the full pipeline over already-resolved targets with the default
/// capabilities: the HTTP renderer, the Tesseract engine and the tracker
/// selected by `config.tracking`.
///
/// Use [`Session`] directly to inject other capabilities or a stop signal.
pub async fn run(targets: Vec<TargetUrl>, config: Config) -> Result<RunSummary> {
    let capabilities = Capabilities::from_config(&config)?;
    let mut session = Session::new(config, capabilities)?;
    session.run(targets, Arc::new(AtomicBool::new(false))).await
}
