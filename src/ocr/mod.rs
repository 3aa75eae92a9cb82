//! Image text extraction
//!
//! This module wraps an external text recognizer behind the [`OcrEngine`]
//! trait and maps whatever it reports onto the closed [`OcrStatus`] taxonomy.
//!
//! # Components
//!
//! - `OcrStatus`: The per-image outcome taxonomy
//! - `ImageOutcome`: One classified image, with its text when there is some
//! - `OcrClassifier`: Runs an engine under a timeout and classifies the result
//! - `Preprocessing`: Grayscale, upscale and sharpen an image before recognition
//! - `TesseractEngine`: Engine backed by the `tesseract` command line tool

mod classifier;
mod format;
mod preprocess;
mod status;
mod tesseract;

pub use classifier::OcrClassifier;
pub use format::{decode_raster, sniff_format, ImageFormat};
pub use preprocess::{Preprocessing, LARGE_IMAGE_PX, SMALL_IMAGE_PX};
pub use status::OcrStatus;
pub use tesseract::TesseractEngine;

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures an engine can report
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrEngineError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Text extraction timed out")]
    Timeout,

    #[error("Text extraction failed: {0}")]
    Processing(String),
}

/// A text recognizer
///
/// Implementations return the raw text they found; an empty string means the
/// engine ran and found nothing.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short identifier used in logs and artifacts
    fn name(&self) -> &str;

    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrEngineError>;
}

/// The classified outcome for one image reference
///
/// `extracted_text` is present and non-empty exactly when the status is
/// [`OcrStatus::Success`]; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageOutcome {
    source_url: String,
    local_path: Option<PathBuf>,
    ocr_status: OcrStatus,
    extracted_text: Option<String>,
}

impl ImageOutcome {
    /// Builds an outcome from engine text; blank text becomes `no_text_found`
    pub fn from_text(source_url: &str, local_path: Option<PathBuf>, text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::without_text(source_url, local_path, OcrStatus::NoTextFound);
        }

        Self {
            source_url: source_url.to_string(),
            local_path,
            ocr_status: OcrStatus::Success,
            extracted_text: Some(trimmed.to_string()),
        }
    }

    /// Builds a text-less outcome
    ///
    /// `Success` cannot exist without text, so it is recorded as `no_text_found`.
    pub fn without_text(source_url: &str, local_path: Option<PathBuf>, status: OcrStatus) -> Self {
        let status = match status {
            OcrStatus::Success => OcrStatus::NoTextFound,
            other => other,
        };

        Self {
            source_url: source_url.to_string(),
            local_path,
            ocr_status: status,
            extracted_text: None,
        }
    }

    /// The image could not be downloaded or decoded
    pub fn download_failed(source_url: &str) -> Self {
        Self::without_text(source_url, None, OcrStatus::ErrorDownloadFailed)
    }

    /// The image was not processed on purpose
    pub fn skipped(source_url: &str) -> Self {
        Self::without_text(source_url, None, OcrStatus::Skipped)
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn ocr_status(&self) -> OcrStatus {
        self.ocr_status
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.extracted_text.as_deref()
    }
}
