use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Pagesift
///
/// Every section is optional in the TOML file; missing sections and keys take
/// the defaults documented on each field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scrape: ScrapeConfig,
    pub retry: RetryConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub ocr: OcrConfig,
    pub tracking: TrackingConfig,
    pub output: OutputConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// What to extract from each page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMode {
    /// Visible text only; images are recorded as skipped
    Text,
    /// Image text only
    Ocr,
    /// Visible text and image text
    #[default]
    Both,
}

impl ScrapeMode {
    /// Returns true if visible page text should be extracted
    pub fn wants_text(&self) -> bool {
        matches!(self, Self::Text | Self::Both)
    }

    /// Returns true if images should be downloaded and classified
    pub fn wants_ocr(&self) -> bool {
        matches!(self, Self::Ocr | Self::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ocr => "ocr",
            Self::Both => "both",
        }
    }
}

/// Page and image fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub mode: ScrapeMode,

    /// Timeout for a single page render attempt (seconds)
    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    /// Timeout for a single image download attempt (seconds)
    #[serde(rename = "image-timeout-secs")]
    pub image_timeout_secs: u64,

    /// Images past this count are recorded as skipped
    #[serde(rename = "max-images-per-page")]
    pub max_images_per_page: Option<usize>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            mode: ScrapeMode::Both,
            page_timeout_secs: 30,
            image_timeout_secs: 10,
            max_images_per_page: None,
        }
    }
}

impl ScrapeConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}

/// Retry budgets, one per kind of network operation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub page: PageRetryConfig,
    pub image: ImageRetryConfig,
}

/// Retry budget for page renders
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageRetryConfig {
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "initial-delay-ms")]
    pub initial_delay_ms: u64,

    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    pub jitter: bool,
}

impl Default for PageRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

/// Retry budget for image downloads
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageRetryConfig {
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "initial-delay-ms")]
    pub initial_delay_ms: u64,

    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    pub jitter: bool,
}

impl Default for ImageRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 10_000,
            jitter: true,
        }
    }
}

/// Per-host token bucket settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    /// Bucket capacity
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst: 5,
        }
    }
}

/// Image text extraction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Upper bound on one engine invocation (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Tesseract executable
    #[serde(rename = "tesseract-path")]
    pub tesseract_path: String,

    /// Tesseract language list, e.g. "eng" or "eng+deu"
    pub languages: String,

    /// Boost contrast and sharpen before recognition
    pub enhancement: bool,

    /// Skip upscaling for images at least 1000px on a side
    #[serde(rename = "fast-processing")]
    pub fast_processing: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            tesseract_path: "tesseract".to_string(),
            languages: "eng".to_string(),
            enhancement: true,
            fast_processing: false,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Durable per-URL state tracking
///
/// `enabled` gates both reading targets from the store and writing
/// lifecycle rows to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,

    /// Value written to `scraping_logs.source`
    #[serde(rename = "source-tag")]
    pub source_tag: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_path: PathBuf::from("pagesift.db"),
            source_tag: "homepage".to_string(),
        }
    }
}

/// Artifact output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory under which each run gets its own subdirectory
    pub root: PathBuf,

    /// Optional prefix for the run directory name
    #[serde(rename = "run-name")]
    pub run_name: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
            run_name: None,
        }
    }
}

/// User agent identification
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "agent-name")]
    pub agent_name: String,

    #[serde(rename = "agent-version")]
    pub agent_version: String,

    /// URL with information about the operator
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            agent_name: "pagesift".to_string(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!("{}/{} (+{})", self.agent_name, self.agent_version, contact),
            None => format!("{}/{}", self.agent_name, self.agent_version),
        }
    }
}
