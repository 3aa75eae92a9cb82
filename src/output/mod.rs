//! Output module for run artifacts and summaries
//!
//! This module handles:
//! - Writing per-page artifacts (HTML, text, metadata, OCR results)
//! - Persisting downloaded images under collision-resistant names
//! - Building, writing and printing the run summary

pub mod stats;
mod writer;

pub use stats::{print_summary, FailedUrl, OcrCounts, RunSummary, TrackingReport};
pub use writer::{run_id_for, OutputWriter, PageArtifacts, WriteReport};

use thiserror::Error;

/// Errors that can occur while writing artifacts
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OutputError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
