//! Shared fakes and fixtures

use async_trait::async_trait;
use pagesift::crawler::{FetchError, PageRenderer, RenderedPage};
use pagesift::ocr::{OcrEngine, OcrEngineError};
use pagesift::storage::{LogId, NoopTracker, PageRecord, StateTracker, StorageError, StorageResult};
use pagesift::{Capabilities, Config, ScrapeStatus, TargetUrl};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A PNG header followed by a marker so each fake image is distinct
pub fn png(marker: u8) -> Vec<u8> {
    let mut bytes = PNG_HEADER.to_vec();
    bytes.extend_from_slice(&[0, 0, 0, marker]);
    bytes
}

/// Fast pacing and backoff so tests finish quickly
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.output.root = root.join("out");
    config.rate_limit.requests_per_second = 1000.0;
    config.rate_limit.burst = 100;
    config.retry.page.initial_delay_ms = 1;
    config.retry.page.max_delay_ms = 5;
    config.retry.page.jitter = false;
    config.retry.image.initial_delay_ms = 1;
    config.retry.image.max_delay_ms = 5;
    config.retry.image.jitter = false;
    config.tracking.database_path = root.join("track.db");
    config
}

/// Renderer serving scripted pages and images keyed by URL
#[derive(Default)]
pub struct FakeRenderer {
    pages: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
    images: Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>,
    render_calls: AtomicU32,
    download_calls: AtomicU32,
}

impl FakeRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues one render result for `url`
    pub fn page(&self, url: &str, result: Result<String, FetchError>) -> &Self {
        self.pages
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn image(&self, url: &str, result: Result<Vec<u8>, FetchError>) -> &Self {
        self.images.lock().unwrap().insert(url.to_string(), result);
        self
    }

    pub fn render_calls(&self) -> u32 {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> u32 {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(url.as_str())
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Ok(html)) => Ok(RenderedPage {
                final_url: url.clone(),
                html,
            }),
            Some(Err(e)) => Err(e),
            None => Err(FetchError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.images
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Http {
                    url: url.to_string(),
                    status: 404,
                })
            })
    }
}

/// OCR engine answering by image content; unknown images have no text
#[derive(Default)]
pub struct FakeOcr {
    answers: Mutex<HashMap<Vec<u8>, Result<String, OcrEngineError>>>,
    calls: AtomicU32,
}

impl FakeOcr {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, image: Vec<u8>, result: Result<String, OcrEngineError>) -> &Self {
        self.answers.lock().unwrap().insert(image, result);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    fn name(&self) -> &str {
        "fake"
    }

    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrEngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Tracker whose store is broken
///
/// Every call fails, except `mark_pending` when `pending_ok` is set so the
/// later transitions get exercised too.
pub struct FailingTracker {
    pending_ok: bool,
    next: u64,
}

impl FailingTracker {
    pub fn always() -> Self {
        Self {
            pending_ok: false,
            next: 0,
        }
    }

    pub fn after_pending() -> Self {
        Self {
            pending_ok: true,
            next: 0,
        }
    }

    fn broken(operation: &str) -> StorageError {
        StorageError::Corrupt(format!("{} failed: store is broken", operation))
    }
}

impl StateTracker for FailingTracker {
    fn backend(&self) -> &'static str {
        "failing"
    }

    fn is_already_completed(&self, _url: &str, _external_id: Option<&str>) -> StorageResult<bool> {
        Err(Self::broken("is_already_completed"))
    }

    fn mark_pending(&mut self, _target: &TargetUrl) -> StorageResult<LogId> {
        if self.pending_ok {
            self.next += 1;
            Ok(LogId::Local(self.next))
        } else {
            Err(Self::broken("mark_pending"))
        }
    }

    fn mark_result(
        &mut self,
        _log_id: LogId,
        _status: ScrapeStatus,
        _error_message: Option<&str>,
    ) -> StorageResult<()> {
        Err(Self::broken("mark_result"))
    }

    fn record_page(&mut self, _record: &PageRecord) -> StorageResult<()> {
        Err(Self::broken("record_page"))
    }
}

pub fn capabilities(
    renderer: &Arc<FakeRenderer>,
    ocr: &Arc<FakeOcr>,
    tracker: Box<dyn StateTracker>,
) -> Capabilities {
    Capabilities {
        renderer: renderer.clone(),
        ocr: ocr.clone(),
        tracker,
    }
}

pub fn untracked(renderer: &Arc<FakeRenderer>, ocr: &Arc<FakeOcr>) -> Capabilities {
    capabilities(renderer, ocr, Box::new(NoopTracker::new()))
}

pub fn page_with_images(text: &str, images: &[&str]) -> String {
    let imgs: String = images
        .iter()
        .map(|src| format!(r#"<img src="{}">"#, src))
        .collect();
    format!(
        "<html><head><title>Test</title></head><body><p>{}</p>{}</body></html>",
        text, imgs
    )
}

pub fn unavailable(url: &str) -> FetchError {
    FetchError::Http {
        url: url.to_string(),
        status: 503,
    }
}
