/// Outcome taxonomy for image text extraction
///
/// Every image discovered on a page ends up with exactly one of these.
use serde::Serialize;
use std::fmt;

/// Result of classifying one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStatus {
    /// The engine returned non-empty text
    Success,

    /// The engine ran but found nothing
    NoTextFound,

    /// The engine cannot read this kind of image
    ErrorUnsupportedFormat,

    /// The engine failed for another reason
    ErrorProcessing,

    /// The engine did not answer within the configured timeout
    ErrorTimeout,

    /// The image bytes could not be obtained; the engine was never invoked
    ErrorDownloadFailed,

    /// The image was deliberately not processed (text mode or per-page cap)
    Skipped,
}

impl OcrStatus {
    /// Returns true if text was extracted
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for the `error_*` statuses
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ErrorUnsupportedFormat
                | Self::ErrorProcessing
                | Self::ErrorTimeout
                | Self::ErrorDownloadFailed
        )
    }

    /// Returns true if the engine was invoked to reach this status
    pub fn engine_invoked(&self) -> bool {
        !matches!(self, Self::ErrorDownloadFailed | Self::Skipped)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoTextFound => "no_text_found",
            Self::ErrorUnsupportedFormat => "error_unsupported_format",
            Self::ErrorProcessing => "error_processing",
            Self::ErrorTimeout => "error_timeout",
            Self::ErrorDownloadFailed => "error_download_failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "no_text_found" => Some(Self::NoTextFound),
            "error_unsupported_format" => Some(Self::ErrorUnsupportedFormat),
            "error_processing" => Some(Self::ErrorProcessing),
            "error_timeout" => Some(Self::ErrorTimeout),
            "error_download_failed" => Some(Self::ErrorDownloadFailed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns all statuses in reporting order
    pub fn all_statuses() -> [Self; 7] {
        [
            Self::Success,
            Self::NoTextFound,
            Self::ErrorUnsupportedFormat,
            Self::ErrorProcessing,
            Self::ErrorTimeout,
            Self::ErrorDownloadFailed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for OcrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
