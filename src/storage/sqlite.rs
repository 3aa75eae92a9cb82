//! SQLite storage implementation
//!
//! This module provides the durable [`StateTracker`] and the read-only query
//! that sources target URLs from the `companies` table.

use crate::source::TargetUrl;
use crate::state::ScrapeStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{LogId, StateTracker, StorageError, StorageResult};
use crate::storage::{CompanyRecord, PageRecord, ScrapeLogRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Longest error message stored in `scraping_logs.error_message`
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1023;

/// SQLite-backed state tracker
pub struct SqliteTracker {
    conn: Connection,
    source_tag: String,
}

impl SqliteTracker {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `source_tag` - Default value for `scraping_logs.source`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteTracker)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path, source_tag: &str) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            source_tag: source_tag.to_string(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            source_tag: "homepage".to_string(),
        })
    }

    /// Reads one scrape log row
    pub fn get_log(&self, log_id: i64) -> StorageResult<Option<ScrapeLogRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT log_id, external_id, source, url_scraped, status, scraping_date, error_message
                 FROM scraping_logs WHERE log_id = ?1",
                params![log_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(
            |(log_id, external_id, source_tag, url, status, timestamp, error_message)| {
                let status = ScrapeStatus::from_db_string(&status).ok_or_else(|| {
                    StorageError::Corrupt(format!("log {} has status '{}'", log_id, status))
                })?;
                Ok(ScrapeLogRecord {
                    log_id,
                    external_id,
                    source_tag,
                    url,
                    status,
                    timestamp,
                    error_message,
                })
            },
        )
        .transpose()
    }

    /// Returns every log row for `url`, oldest first
    pub fn logs_for_url(&self, url: &str) -> StorageResult<Vec<ScrapeLogRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT log_id FROM scraping_logs WHERE url_scraped = ?1 ORDER BY log_id ASC")?;
        let ids = stmt
            .query_map(params![url], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut logs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(log) = self.get_log(id)? {
                logs.push(log);
            }
        }
        Ok(logs)
    }

    /// Counts log rows in the given status
    pub fn count_by_status(&self, status: ScrapeStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scraping_logs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Counts rows in `scraped_pages`
    pub fn count_scraped_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scraped_pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns `extraction_notes` of every page record for `url`, oldest first
    pub fn page_notes_for_url(&self, url: &str) -> StorageResult<Vec<Option<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT extraction_notes FROM scraped_pages WHERE url = ?1 ORDER BY page_id ASC")?;
        let notes = stmt
            .query_map(params![url], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Reads company websites in `created_at, client_id` order
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of rows
    /// * `offset` - Rows to skip
    pub fn fetch_companies(&self, limit: u64, offset: u64) -> StorageResult<Vec<CompanyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, company_name, website FROM companies
             WHERE website IS NOT NULL AND website <> ''
             ORDER BY created_at ASC, client_id ASC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                Ok(CompanyRecord {
                    client_id: row.get(0)?,
                    company_name: row.get(1)?,
                    website: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Resolves companies into targets tagged with this tracker's source tag
    pub fn fetch_company_targets(&self, limit: u64, offset: u64) -> StorageResult<Vec<TargetUrl>> {
        Ok(self
            .fetch_companies(limit, offset)?
            .into_iter()
            .map(|company| TargetUrl {
                url: company.website.trim().to_string(),
                external_id: Some(company.client_id),
                source_tag: Some(self.source_tag.clone()),
            })
            .collect())
    }

    /// Inserts a company row (seeding and tests)
    pub fn insert_company(
        &mut self,
        client_id: &str,
        company_name: Option<&str>,
        website: Option<&str>,
        created_at: &str,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO companies (client_id, company_name, website, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![client_id, company_name, website, created_at],
        )?;
        Ok(())
    }

    fn current_status(&self, log_id: i64) -> StorageResult<Option<ScrapeStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM scraping_logs WHERE log_id = ?1",
                params![log_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(status.and_then(|s| ScrapeStatus::from_db_string(&s)))
    }
}

impl StateTracker for SqliteTracker {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn is_already_completed(&self, url: &str, external_id: Option<&str>) -> StorageResult<bool> {
        let found: Option<i64> = match external_id {
            Some(id) => self
                .conn
                .query_row(
                    "SELECT 1 FROM scraping_logs
                     WHERE url_scraped = ?1 AND external_id = ?2 AND status = ?3 LIMIT 1",
                    params![url, id, ScrapeStatus::Completed.to_db_string()],
                    |row| row.get(0),
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    "SELECT 1 FROM scraping_logs
                     WHERE url_scraped = ?1 AND status = ?2 LIMIT 1",
                    params![url, ScrapeStatus::Completed.to_db_string()],
                    |row| row.get(0),
                )
                .optional()?,
        };

        Ok(found.is_some())
    }

    fn mark_pending(&mut self, target: &TargetUrl) -> StorageResult<LogId> {
        let now = Utc::now().to_rfc3339();
        let source = target.source_tag.as_deref().unwrap_or(&self.source_tag);

        self.conn.execute(
            "INSERT INTO scraping_logs (external_id, source, url_scraped, status, scraping_date, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![
                target.external_id,
                source,
                target.url,
                ScrapeStatus::Pending.to_db_string(),
                now
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Logged pending scrape {} for {}", id, target.url);
        Ok(LogId::Stored(id))
    }

    fn mark_result(
        &mut self,
        log_id: LogId,
        status: ScrapeStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let LogId::Stored(id) = log_id else {
            return Err(StorageError::LogNotFound(log_id));
        };

        if !ScrapeStatus::Pending.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                log_id,
                from: ScrapeStatus::Pending,
                to: status,
            });
        }

        let now = Utc::now().to_rfc3339();
        let message = error_message.map(truncate_error);

        // The status guard makes the transition at-most-once
        let updated = self.conn.execute(
            "UPDATE scraping_logs SET status = ?1, error_message = ?2, scraping_date = ?3
             WHERE log_id = ?4 AND status = ?5",
            params![
                status.to_db_string(),
                message,
                now,
                id,
                ScrapeStatus::Pending.to_db_string()
            ],
        )?;

        if updated == 0 {
            return match self.current_status(id)? {
                Some(from) => Err(StorageError::InvalidTransition {
                    log_id,
                    from,
                    to: status,
                }),
                None => Err(StorageError::LogNotFound(log_id)),
            };
        }

        Ok(())
    }

    fn record_page(&mut self, record: &PageRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO scraped_pages (external_id, url, page_type, scraped_at, raw_html_path,
             plain_text_path, summary, extraction_notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.external_id,
                record.url,
                record.page_type,
                record.scraped_at.to_rfc3339(),
                record.raw_html_path,
                record.plain_text_path,
                record.summary,
                record.extraction_notes
            ],
        )?;
        Ok(())
    }
}

/// Cuts `message` to [`MAX_ERROR_MESSAGE_CHARS`] characters
pub fn truncate_error(message: &str) -> String {
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}
