//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Pagesift database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per attempt to scrape a URL
CREATE TABLE IF NOT EXISTS scraping_logs (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT,
    source TEXT,
    url_scraped TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed')),
    scraping_date TEXT NOT NULL,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_scraping_logs_url ON scraping_logs(url_scraped);
CREATE INDEX IF NOT EXISTS idx_scraping_logs_status ON scraping_logs(status);

-- Artifacts of completed scrapes
CREATE TABLE IF NOT EXISTS scraped_pages (
    page_id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT,
    url TEXT NOT NULL,
    page_type TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    raw_html_path TEXT,
    plain_text_path TEXT,
    summary TEXT,
    extraction_notes TEXT
);

CREATE INDEX IF NOT EXISTS idx_scraped_pages_url ON scraped_pages(url);

-- Input: companies whose websites should be scraped
CREATE TABLE IF NOT EXISTS companies (
    client_id TEXT PRIMARY KEY,
    company_name TEXT,
    website TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_companies_created ON companies(created_at, client_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
