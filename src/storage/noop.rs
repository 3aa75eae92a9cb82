//! Tracker that persists nothing

use crate::source::TargetUrl;
use crate::state::ScrapeStatus;
use crate::storage::traits::{LogId, StateTracker, StorageResult};
use crate::storage::PageRecord;

/// Backend name reported when tracking was requested but the store failed to open
pub const UNAVAILABLE_BACKEND: &str = "sqlite (unavailable)";

/// Accepts every write and never reports a URL as completed
///
/// Stands in both when tracking is disabled and when the configured store
/// cannot be opened; in the latter case it keeps the open error.
#[derive(Debug)]
pub struct NoopTracker {
    next: u64,
    backend: &'static str,
    reason: Option<String>,
}

impl Default for NoopTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopTracker {
    pub fn new() -> Self {
        Self {
            next: 0,
            backend: "none",
            reason: None,
        }
    }

    /// File-only tracker for a store that failed to open
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            next: 0,
            backend: UNAVAILABLE_BACKEND,
            reason: Some(reason.into()),
        }
    }
}

impl StateTracker for NoopTracker {
    fn backend(&self) -> &'static str {
        self.backend
    }

    fn unavailable_reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    fn is_already_completed(&self, _url: &str, _external_id: Option<&str>) -> StorageResult<bool> {
        Ok(false)
    }

    fn mark_pending(&mut self, _target: &TargetUrl) -> StorageResult<LogId> {
        self.next += 1;
        Ok(LogId::Local(self.next))
    }

    fn mark_result(
        &mut self,
        _log_id: LogId,
        _status: ScrapeStatus,
        _error_message: Option<&str>,
    ) -> StorageResult<()> {
        Ok(())
    }

    fn record_page(&mut self, _record: &PageRecord) -> StorageResult<()> {
        Ok(())
    }
}
