//! Paced, retried fetching of pages and images
//!
//! Every network attempt goes through the same steps:
//! 1. Wait for a token from the per-host rate limiter
//! 2. Call the renderer under the configured timeout
//! 3. Let the retry controller decide whether to try again
//!
//! Pages and images have independent timeouts and retry budgets.

use crate::config::Config;
use crate::crawler::error::{default_fetch_policy, FetchError};
use crate::crawler::parser::parse_page;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::renderer::{PageRenderer, RenderedPage};
use crate::crawler::retry::{RetryController, RetryError, RetryPolicy};
use crate::url::{extract_host, validate_url};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A rendered page with its extracted content
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The validated URL that was requested
    pub url: Url,
    /// URL after redirects
    pub final_url: Url,
    pub html: String,
    pub title: Option<String>,
    pub visible_text: String,
    /// Absolute image references in discovery order
    pub image_refs: Vec<String>,
}

/// Fetches pages and images through a [`PageRenderer`]
pub struct FetchEngine {
    renderer: Arc<dyn PageRenderer>,
    limiter: Arc<RateLimiter>,
    page_retry: RetryController,
    image_retry: RetryController,
    page_timeout: Duration,
    image_timeout: Duration,
}

impl FetchEngine {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        limiter: Arc<RateLimiter>,
        page_policy: RetryPolicy,
        image_policy: RetryPolicy,
        page_timeout: Duration,
        image_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            limiter,
            page_retry: RetryController::new(page_policy),
            image_retry: RetryController::new(image_policy),
            page_timeout,
            image_timeout,
        }
    }

    /// Builds an engine with budgets and pacing taken from `config`
    pub fn from_config(renderer: Arc<dyn PageRenderer>, config: &Config) -> Self {
        Self::new(
            renderer,
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            RetryPolicy::from(&config.retry.page),
            RetryPolicy::from(&config.retry.image),
            config.scrape.page_timeout(),
            config.scrape.image_timeout(),
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Validates, renders and parses one page
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - The page rendered within the retry budget
    /// * `Err(RetryError<FetchError>)` - The URL was invalid, a fatal error
    ///   occurred, or every attempt failed
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchedPage, RetryError<FetchError>> {
        let url = validate_url(raw_url).map_err(|source| RetryError {
            attempts: 0,
            fatal: true,
            source: FetchError::InvalidUrl {
                url: raw_url.to_string(),
                source,
            },
        })?;

        let host = extract_host(&url).unwrap_or_default();
        let url_ref = &url;
        let host_ref = host.as_str();

        let rendered = self
            .page_retry
            .run(move || self.render_once(url_ref, host_ref), default_fetch_policy)
            .await?;

        let parsed = parse_page(&rendered.html, &rendered.final_url);
        tracing::debug!(
            "Rendered {} ({} bytes, {} images)",
            rendered.final_url,
            rendered.html.len(),
            parsed.image_refs.len()
        );

        Ok(FetchedPage {
            url,
            final_url: rendered.final_url,
            html: rendered.html,
            title: parsed.title,
            visible_text: parsed.visible_text,
            image_refs: parsed.image_refs,
        })
    }

    /// Obtains the bytes behind an image reference
    ///
    /// `data:` references are decoded locally without pacing or retries.
    pub async fn download_image(&self, reference: &str) -> Result<Vec<u8>, RetryError<FetchError>> {
        if reference.starts_with("data:") {
            return decode_data_url(reference).map_err(|source| RetryError {
                attempts: 1,
                fatal: true,
                source,
            });
        }

        let url = Url::parse(reference)
            .map_err(|e| crate::UrlError::Parse(e.to_string()))
            .and_then(|url| match url.scheme() {
                "http" | "https" => Ok(url),
                other => Err(crate::UrlError::InvalidScheme(other.to_string())),
            })
            .map_err(|source| RetryError {
                attempts: 0,
                fatal: true,
                source: FetchError::InvalidUrl {
                    url: reference.to_string(),
                    source,
                },
            })?;

        let host = extract_host(&url).unwrap_or_default();
        let url_ref = &url;
        let host_ref = host.as_str();

        self.image_retry
            .run(move || self.download_once(url_ref, host_ref), default_fetch_policy)
            .await
    }

    async fn render_once(&self, url: &Url, host: &str) -> Result<RenderedPage, FetchError> {
        self.limiter.acquire(host).await;
        match tokio::time::timeout(self.page_timeout, self.renderer.render(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    async fn download_once(&self, url: &Url, host: &str) -> Result<Vec<u8>, FetchError> {
        self.limiter.acquire(host).await;
        match tokio::time::timeout(self.image_timeout, self.renderer.download(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

/// Decodes a `data:` URL into its bytes
///
/// Base64 payloads are decoded; anything else is taken verbatim.
pub fn decode_data_url(reference: &str) -> Result<Vec<u8>, FetchError> {
    let rest = reference
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::DataUrl("missing data: prefix".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::DataUrl("missing ',' separator".to_string()))?;

    if header.to_ascii_lowercase().ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact)
            .map_err(|e| FetchError::DataUrl(format!("invalid base64 payload: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}
