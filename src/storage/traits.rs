//! Tracker trait and error types
//!
//! This module defines the interface the pipeline uses to record per-URL
//! lifecycle state, and the errors a backend can report.

use crate::source::TargetUrl;
use crate::state::ScrapeStatus;
use crate::storage::PageRecord;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scrape log not found: {0}")]
    LogNotFound(LogId),

    #[error("Invalid status transition for log {log_id}: {from} -> {to}")]
    InvalidTransition {
        log_id: LogId,
        from: ScrapeStatus,
        to: ScrapeStatus,
    },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Identifier of a scrape log row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogId {
    /// Row id in a durable store
    Stored(i64),
    /// Synthetic id handed out when nothing is persisted
    Local(u64),
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored(id) => write!(f, "{}", id),
            Self::Local(n) => write!(f, "local-{}", n),
        }
    }
}

/// Records the lifecycle of each URL
///
/// Implementations own their storage; callers only issue create and
/// transition requests. The per-URL state machine is
/// `absent -> pending -> {completed, failed}`.
pub trait StateTracker: Send {
    /// Short backend name for logs and the run summary
    fn backend(&self) -> &'static str;

    /// Why the configured store could not be used, if it could not
    fn unavailable_reason(&self) -> Option<&str> {
        None
    }

    /// Returns true iff a completed row exists for `url`
    ///
    /// When `external_id` is given the row must carry the same id.
    fn is_already_completed(&self, url: &str, external_id: Option<&str>) -> StorageResult<bool>;

    /// Creates a pending row for `target`
    fn mark_pending(&mut self, target: &TargetUrl) -> StorageResult<LogId>;

    /// Moves a pending row to `status`
    ///
    /// Only `pending -> completed` and `pending -> failed` are accepted.
    fn mark_result(
        &mut self,
        log_id: LogId,
        status: ScrapeStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Stores where a completed page's artifacts were written
    fn record_page(&mut self, record: &PageRecord) -> StorageResult<()>;
}
