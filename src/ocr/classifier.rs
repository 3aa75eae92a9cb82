use crate::ocr::{ImageOutcome, OcrEngine, OcrEngineError, OcrStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Runs an [`OcrEngine`] once per image and classifies what comes back
///
/// There is no retry here: one invocation, bounded by `timeout`.
#[derive(Clone)]
pub struct OcrClassifier {
    engine: Arc<dyn OcrEngine>,
    timeout: Duration,
}

impl OcrClassifier {
    pub fn new(engine: Arc<dyn OcrEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Classifies one downloaded image
    ///
    /// # Arguments
    ///
    /// * `source_url` - The image reference as discovered on the page
    /// * `local_path` - Where the bytes were persisted, if they were
    /// * `bytes` - The image content
    pub async fn classify(
        &self,
        source_url: &str,
        local_path: Option<PathBuf>,
        bytes: &[u8],
    ) -> ImageOutcome {
        let result = tokio::time::timeout(self.timeout, self.engine.extract_text(bytes)).await;

        let outcome = match result {
            Ok(Ok(text)) => ImageOutcome::from_text(source_url, local_path, &text),
            Ok(Err(e)) => {
                let status = match e {
                    OcrEngineError::UnsupportedFormat(_) => OcrStatus::ErrorUnsupportedFormat,
                    OcrEngineError::Timeout => OcrStatus::ErrorTimeout,
                    OcrEngineError::Processing(_) => OcrStatus::ErrorProcessing,
                };
                tracing::debug!("OCR on {} reported {}: {}", source_url, status, e);
                ImageOutcome::without_text(source_url, local_path, status)
            }
            Err(_) => {
                tracing::debug!("OCR on {} exceeded {:?}", source_url, self.timeout);
                ImageOutcome::without_text(source_url, local_path, OcrStatus::ErrorTimeout)
            }
        };

        match outcome.ocr_status() {
            OcrStatus::Success => {}
            OcrStatus::NoTextFound => {
                tracing::warn!("OCR found no text in {}", source_url)
            }
            status => tracing::warn!("OCR error for {}: {}", source_url, status),
        }

        outcome
    }

    /// Outcome for an image whose bytes could not be obtained
    pub fn download_failed(&self, source_url: &str) -> ImageOutcome {
        ImageOutcome::download_failed(source_url)
    }

    /// Outcome for an image that is deliberately not processed
    pub fn skipped(&self, source_url: &str) -> ImageOutcome {
        ImageOutcome::skipped(source_url)
    }
}
