//! Storage module for per-URL scrape tracking
//!
//! This module handles durable bookkeeping for a run:
//! - SQLite database initialization and schema management
//! - Scrape log rows moving through `pending -> {completed, failed}`
//! - Artifact records for completed pages
//! - Reading target websites from the `companies` table
//!
//! When tracking is disabled, or the database cannot be opened, the pipeline
//! uses [`NoopTracker`], which accepts every write and never reports a URL as
//! completed.

mod noop;
mod schema;
mod sqlite;
mod traits;

pub use noop::{NoopTracker, UNAVAILABLE_BACKEND};
pub use sqlite::{truncate_error, SqliteTracker, MAX_ERROR_MESSAGE_CHARS};
pub use traits::{LogId, StateTracker, StorageError, StorageResult};

use crate::config::TrackingConfig;
use crate::state::ScrapeStatus;
use chrono::{DateTime, Utc};

/// Opens the tracker selected by `config`
///
/// A database that cannot be opened does not stop the run: the returned
/// tracker is a [`NoopTracker`] reporting [`UNAVAILABLE_BACKEND`] and
/// carrying the open error.
pub fn open_tracker(config: &TrackingConfig) -> Box<dyn StateTracker> {
    if !config.enabled {
        return Box::new(NoopTracker::new());
    }

    match SqliteTracker::new(&config.database_path, &config.source_tag) {
        Ok(tracker) => {
            tracing::info!("Tracking scrapes in {}", config.database_path.display());
            Box::new(tracker)
        }
        Err(e) => {
            let reason = format!("{}: {}", config.database_path.display(), e);
            tracing::warn!("Tracking database unavailable, continuing without it: {}", reason);
            Box::new(NoopTracker::unavailable(reason))
        }
    }
}

/// Represents a row in `scraping_logs`
#[derive(Debug, Clone)]
pub struct ScrapeLogRecord {
    pub log_id: i64,
    pub external_id: Option<String>,
    pub source_tag: Option<String>,
    pub url: String,
    pub status: ScrapeStatus,
    pub timestamp: String,
    pub error_message: Option<String>,
}

/// Represents a row in `scraped_pages`
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub external_id: Option<String>,
    pub url: String,
    pub page_type: String,
    pub scraped_at: DateTime<Utc>,
    pub raw_html_path: Option<String>,
    pub plain_text_path: Option<String>,
    pub summary: Option<String>,
    pub extraction_notes: Option<String>,
}

/// Represents a row in `companies`
#[derive(Debug, Clone)]
pub struct CompanyRecord {
    pub client_id: String,
    pub company_name: Option<String>,
    pub website: String,
}
