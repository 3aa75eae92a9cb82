//! Target URL sourcing
//!
//! A run takes its URLs from exactly one place: a single URL, a file with one
//! URL per line, or the `companies` table of the tracking database. The order
//! produced here is the order in which the session processes the URLs.

use crate::config::Config;
use crate::storage::SqliteTracker;
use crate::{Result, ScrapeError};
use std::fmt;
use std::path::PathBuf;

/// Number of companies read from the database when no range is given
pub const DEFAULT_STORE_LIMIT: u64 = 10;

/// One URL to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub url: String,
    /// Client or company key the URL belongs to
    pub external_id: Option<String>,
    /// Kind of page, e.g. "homepage"
    pub source_tag: Option<String>,
}

impl TargetUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            external_id: None,
            source_tag: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_source_tag(mut self, source_tag: impl Into<String>) -> Self {
        self.source_tag = Some(source_tag.into());
        self
    }
}

/// A 1-indexed inclusive range of company rows, written `START-END`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRange {
    pub start: u64,
    pub end: u64,
}

impl DbRange {
    /// Parses `START-END`
    ///
    /// # Returns
    ///
    /// * `Ok(DbRange)` - `start >= 1` and `end >= start`
    /// * `Err(ScrapeError::Source)` - Malformed or empty range
    pub fn parse(raw: &str) -> Result<Self> {
        let (start, end) = raw.trim().split_once('-').ok_or_else(|| {
            ScrapeError::Source(format!("invalid range '{}', expected START-END", raw))
        })?;

        let parse_bound = |s: &str| {
            s.trim().parse::<u64>().map_err(|_| {
                ScrapeError::Source(format!(
                    "invalid range '{}', START and END must be integers",
                    raw
                ))
            })
        };
        let start = parse_bound(start)?;
        let end = parse_bound(end)?;

        if start < 1 {
            return Err(ScrapeError::Source(format!(
                "invalid range '{}', START must be >= 1",
                raw
            )));
        }
        if end < start {
            return Err(ScrapeError::Source(format!(
                "invalid range '{}', END must be >= START",
                raw
            )));
        }

        Ok(Self { start, end })
    }

    /// Rows to skip
    pub fn offset(&self) -> u64 {
        self.start - 1
    }

    /// Rows to read
    pub fn limit(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl fmt::Display for DbRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Where the URLs of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    Single(String),
    File(PathBuf),
    Store {
        /// Overrides `limit` when present
        range: Option<DbRange>,
        limit: u64,
    },
}

impl UrlSource {
    /// Human-readable description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::Single(url) => format!("single URL {}", url),
            Self::File(path) => format!("file {}", path.display()),
            Self::Store {
                range: Some(range), ..
            } => format!(
                "database (range {}, limit {}, offset {})",
                range,
                range.limit(),
                range.offset()
            ),
            Self::Store { range: None, limit } => format!("database (limit {})", limit),
        }
    }
}

/// Resolves `source` into the ordered list of targets
///
/// URLs are not validated here; invalid ones fail individually when fetched.
///
/// # Returns
///
/// * `Ok(Vec<TargetUrl>)` - At least one target
/// * `Err(ScrapeError)` - The source could not be read, store sourcing was
///   requested without tracking, or nothing was found
pub fn resolve(source: &UrlSource, config: &Config) -> Result<Vec<TargetUrl>> {
    let targets = match source {
        UrlSource::Single(url) => {
            let url = url.trim();
            if url.is_empty() {
                Vec::new()
            } else {
                vec![TargetUrl::new(url)]
            }
        }
        UrlSource::File(path) => {
            let content = std::fs::read_to_string(path)?;
            parse_url_list(&content)
        }
        UrlSource::Store { range, limit } => {
            if !config.tracking.enabled {
                return Err(ScrapeError::Source(
                    "reading URLs from the database requires tracking to be enabled".to_string(),
                ));
            }

            let (limit, offset) = match range {
                Some(range) => (range.limit(), range.offset()),
                None => (*limit, 0),
            };

            let tracker =
                SqliteTracker::new(&config.tracking.database_path, &config.tracking.source_tag)?;
            tracker.fetch_company_targets(limit, offset)?
        }
    };

    if targets.is_empty() {
        return Err(ScrapeError::NoTargets(source.describe()));
    }

    tracing::info!("Resolved {} URLs from {}", targets.len(), source.describe());
    Ok(targets)
}

/// Splits a URL file into targets, one per non-blank line
pub fn parse_url_list(content: &str) -> Vec<TargetUrl> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(TargetUrl::new)
        .collect()
}
