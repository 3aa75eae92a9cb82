use crate::crawler::retry::ErrorClass;
use crate::UrlError;
use thiserror::Error;

/// Failures of a single page render or image download attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl { url: String, source: UrlError },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Undecodable data URL: {0}")]
    DataUrl(String),
}

impl FetchError {
    /// Classifies this error for the retry controller
    ///
    /// | Error | Class |
    /// |-------|-------|
    /// | Timeout, network, render | Transient |
    /// | HTTP 429, HTTP 5xx | Transient |
    /// | Other HTTP statuses | Fatal |
    /// | Invalid URL, bad `data:` URL | Fatal |
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::Render { .. } => {
                ErrorClass::Transient
            }
            Self::Http { status, .. } if *status == 429 || (500..600).contains(status) => {
                ErrorClass::Transient
            }
            Self::Http { .. } | Self::InvalidUrl { .. } | Self::DataUrl(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// The default transient/fatal policy for page and image fetches
pub fn default_fetch_policy(error: &FetchError) -> ErrorClass {
    error.class()
}
