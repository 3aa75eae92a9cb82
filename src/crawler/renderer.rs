//! Page rendering capability
//!
//! The pipeline never talks HTTP directly. It asks a [`PageRenderer`] for the
//! rendered HTML of a page and for the raw bytes of an image. The default
//! implementation, [`HttpRenderer`], is a plain HTTP client; a headless browser
//! can be plugged in behind the same trait.

use crate::config::UserAgentConfig;
use crate::crawler::error::FetchError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;
use url::Url;

/// HTML returned by a renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: Url,
    pub html: String,
}

/// Something that can render pages and download images
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders `url` and returns its HTML
    async fn render(&self, url: &Url) -> Result<RenderedPage, FetchError>;

    /// Downloads the resource at `url`
    async fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageRenderer`] backed by `reqwest`
///
/// Returns the HTML as served; no script execution.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config, timeout)?))
    }

    async fn get(&self, url: &Url) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        let response = self.get(url).await?;
        let final_url = response.url().clone();

        let html = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        Ok(RenderedPage { final_url, html })
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        Ok(bytes.to_vec())
    }
}

/// Maps a transport error onto the fetch taxonomy
fn classify_reqwest_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
