//! Session orchestration
//!
//! The session drives every target URL through the pipeline:
//! 1. Skip URLs the tracker reports as completed
//! 2. Record a pending row
//! 3. Fetch and parse the page
//! 4. Download, persist and classify each image
//! 5. Write the page artifacts
//! 6. Record the outcome and fold it into the run summary
//!
//! Nothing that goes wrong for one URL stops the run.

use crate::config::Config;
use crate::crawler::fetcher::{FetchEngine, FetchedPage};
use crate::crawler::renderer::{HttpRenderer, PageRenderer};
use crate::ocr::{ImageOutcome, OcrClassifier, OcrEngine, TesseractEngine};
use crate::output::{run_id_for, OutputWriter, PageArtifacts, RunSummary};
use crate::source::TargetUrl;
use crate::state::ScrapeStatus;
use crate::storage::{open_tracker, LogId, PageRecord, StateTracker};
use crate::url::{extract_host, target_identity};
use crate::{Result, ScrapeError};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Value written to `scraped_pages.page_type`
const PAGE_TYPE: &str = "website";

/// The external capabilities a session runs on
pub struct Capabilities {
    pub renderer: Arc<dyn PageRenderer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub tracker: Box<dyn StateTracker>,
}

impl Capabilities {
    /// HTTP renderer, Tesseract engine and the tracker selected by `config`
    ///
    /// Only building the HTTP client can fail; an unopenable tracking store
    /// falls back to file-only mode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client_timeout = config
            .scrape
            .page_timeout()
            .max(config.scrape.image_timeout());

        Ok(Self {
            renderer: Arc::new(HttpRenderer::from_config(&config.user_agent, client_timeout)?),
            ocr: Arc::new(TesseractEngine::from_config(&config.ocr)),
            tracker: open_tracker(&config.tracking),
        })
    }
}

/// Outcome of one attempted URL
///
/// Built once when the URL finishes and then only read.
#[derive(Debug, Clone)]
pub struct ScrapeAttemptResult {
    pub url: String,
    /// Either completed or failed
    pub status: ScrapeStatus,
    pub html_path: Option<PathBuf>,
    pub text_path: Option<PathBuf>,
    pub structured_data_path: Option<PathBuf>,
    pub ocr_summary_path: Option<PathBuf>,
    pub image_results: Vec<ImageOutcome>,
    pub error_message: Option<String>,
    /// Non-fatal write and store problems
    pub notes: Vec<String>,
    pub duration: Duration,
}

impl ScrapeAttemptResult {
    fn failed(url: &str, message: String, notes: Vec<String>, duration: Duration) -> Self {
        Self {
            url: url.to_string(),
            status: ScrapeStatus::Failed,
            html_path: None,
            text_path: None,
            structured_data_path: None,
            ocr_summary_path: None,
            image_results: Vec::new(),
            error_message: Some(message),
            notes,
            duration,
        }
    }
}

/// Runs targets through the pipeline and aggregates the outcome
pub struct Session {
    config: Config,
    run_id: String,
    started_at: chrono::DateTime<Utc>,
    fetcher: FetchEngine,
    classifier: OcrClassifier,
    tracker: Box<dyn StateTracker>,
    writer: OutputWriter,
}

impl Session {
    pub fn new(config: Config, capabilities: Capabilities) -> Result<Self> {
        crate::config::validate(&config)?;

        let started_at = Utc::now();
        let run_id = run_id_for(config.output.run_name.as_deref(), &started_at);
        let writer = OutputWriter::new(&config.output.root, &run_id);
        let fetcher = FetchEngine::from_config(capabilities.renderer, &config);
        let classifier = OcrClassifier::new(capabilities.ocr, config.ocr.timeout());

        Ok(Self {
            config,
            run_id,
            started_at,
            fetcher,
            classifier,
            tracker: capabilities.tracker,
            writer,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn output(&self) -> &OutputWriter {
        &self.writer
    }

    /// Processes `targets` in order
    ///
    /// `stop` is checked before each URL; once set, the remaining URLs are not
    /// attempted and the summary is marked cancelled.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Every URL was attempted, skipped, or left by cancellation
    /// * `Err(ScrapeError)` - `targets` is empty or the run directory could not be created
    pub async fn run(&mut self, targets: Vec<TargetUrl>, stop: Arc<AtomicBool>) -> Result<RunSummary> {
        if targets.is_empty() {
            return Err(ScrapeError::NoTargets("empty target list".to_string()));
        }

        let mut summary = RunSummary::new(
            self.run_id.clone(),
            targets.len(),
            self.tracker.backend(),
            self.started_at,
        );
        if let Some(reason) = self.tracker.unavailable_reason() {
            summary.record_tracking_error(format!("tracking store unavailable: {}", reason));
        }
        self.writer.create_run_dir()?;

        tracing::info!(
            "Starting run {} with {} URLs (mode: {}, tracking: {}, ocr: {})",
            self.run_id,
            targets.len(),
            self.config.scrape.mode.as_str(),
            self.tracker.backend(),
            self.classifier.engine_name()
        );

        let total = targets.len();
        let mut cancelled = false;

        for (index, target) in targets.iter().enumerate() {
            if stop.load(Ordering::SeqCst) {
                tracing::warn!(
                    "Stop requested, {} URLs left unattempted",
                    total - index
                );
                cancelled = true;
                break;
            }

            match self
                .tracker
                .is_already_completed(&target.url, target.external_id.as_deref())
            {
                Ok(true) => {
                    tracing::info!("[{}/{}] Skipping {}: already completed", index + 1, total, target.url);
                    summary.record_skip();
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Could not check tracking state for {}: {}", target.url, e);
                    summary.record_tracking_error(format!("{}: {}", target.url, e));
                }
            }

            tracing::info!("[{}/{}] Processing {}", index + 1, total, target.url);
            let result = self.process_target(target, &mut summary).await;

            match result.status {
                ScrapeStatus::Completed => tracing::info!(
                    "Completed {} in {:.2}s ({} images)",
                    result.url,
                    result.duration.as_secs_f64(),
                    result.image_results.len()
                ),
                _ => tracing::error!(
                    "Failed {}: {}",
                    result.url,
                    result.error_message.as_deref().unwrap_or("unknown error")
                ),
            }

            summary.record(&result);
        }

        summary.finish(Utc::now(), cancelled);

        match self.writer.write_run_summary(&summary) {
            Ok(path) => tracing::info!("Run summary written to {}", path.display()),
            Err(e) => tracing::warn!("Could not write run summary: {}", e),
        }

        Ok(summary)
    }

    async fn process_target(
        &mut self,
        target: &TargetUrl,
        summary: &mut RunSummary,
    ) -> ScrapeAttemptResult {
        let started = Instant::now();

        // Without a pending row there is nothing to transition later
        let log_id = match self.tracker.mark_pending(target) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Could not record pending state for {}: {}", target.url, e);
                summary.record_tracking_error(format!("{}: {}", target.url, e));
                None
            }
        };

        let page = match self.fetcher.fetch(&target.url).await {
            Ok(page) => page,
            Err(e) => {
                let message = e.to_string();
                self.finish_log(log_id, target, ScrapeStatus::Failed, Some(&message), summary);
                return ScrapeAttemptResult::failed(&target.url, message, Vec::new(), started.elapsed());
            }
        };

        let identity = target_identity(&page.url);
        let (image_results, mut notes) = self.process_images(&identity, &page).await;

        let hostname = extract_host(&page.url).unwrap_or_default();
        let report = self.writer.write_page(
            &identity,
            &PageArtifacts {
                url: &target.url,
                hostname: &hostname,
                html: &page.html,
                visible_text: &page.visible_text,
                mode: self.config.scrape.mode,
                images: &image_results,
            },
        );
        notes.extend(report.notes.iter().cloned());

        if !report.primary_ok() {
            let message = format!("Failed to save files for {}: {}", target.url, report.notes.join("; "));
            self.finish_log(log_id, target, ScrapeStatus::Failed, Some(&message), summary);
            let mut result =
                ScrapeAttemptResult::failed(&target.url, message, notes, started.elapsed());
            result.image_results = image_results;
            return result;
        }

        self.finish_log(log_id, target, ScrapeStatus::Completed, None, summary);

        if log_id.is_some() {
            let record = PageRecord {
                external_id: target.external_id.clone(),
                url: target.url.clone(),
                page_type: PAGE_TYPE.to_string(),
                scraped_at: Utc::now(),
                raw_html_path: report.html_path.as_ref().map(|p| p.display().to_string()),
                plain_text_path: report.text_path.as_ref().map(|p| p.display().to_string()),
                summary: Some(describe_images(&image_results)),
                extraction_notes: (!notes.is_empty()).then(|| notes.join("; ")),
            };
            if let Err(e) = self.tracker.record_page(&record) {
                tracing::warn!("Could not record page artifacts for {}: {}", target.url, e);
                summary.record_tracking_error(format!("{}: {}", target.url, e));
                notes.push(format!("page record not stored: {}", e));
            }
        }

        ScrapeAttemptResult {
            url: target.url.clone(),
            status: ScrapeStatus::Completed,
            html_path: report.html_path,
            text_path: report.text_path,
            structured_data_path: report.structured_path,
            ocr_summary_path: report.ocr_summary_path,
            image_results,
            error_message: None,
            notes,
            duration: started.elapsed(),
        }
    }

    /// Downloads, persists and classifies each image in discovery order
    async fn process_images(
        &self,
        identity: &str,
        page: &FetchedPage,
    ) -> (Vec<ImageOutcome>, Vec<String>) {
        let mut outcomes = Vec::with_capacity(page.image_refs.len());
        let mut notes = Vec::new();
        let wants_ocr = self.config.scrape.mode.wants_ocr();
        let cap = self.config.scrape.max_images_per_page;

        for (index, reference) in page.image_refs.iter().enumerate() {
            if !wants_ocr || cap.is_some_and(|max| index >= max) {
                outcomes.push(self.classifier.skipped(reference));
                continue;
            }

            let bytes = match self.fetcher.download_image(reference).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Failed to download image {}: {}", reference, e);
                    outcomes.push(self.classifier.download_failed(reference));
                    continue;
                }
            };

            let local_path = match self.writer.write_image(identity, reference, &bytes) {
                Ok(path) => Some(path),
                Err(e) => {
                    notes.push(e.to_string());
                    None
                }
            };

            outcomes.push(self.classifier.classify(reference, local_path, &bytes).await);
        }

        (outcomes, notes)
    }

    fn finish_log(
        &mut self,
        log_id: Option<LogId>,
        target: &TargetUrl,
        status: ScrapeStatus,
        error_message: Option<&str>,
        summary: &mut RunSummary,
    ) {
        let Some(log_id) = log_id else {
            return;
        };

        if let Err(e) = self.tracker.mark_result(log_id, status, error_message) {
            tracing::warn!(
                "Could not record {} state for {}: {}",
                status,
                target.url,
                e
            );
            summary.record_tracking_error(format!("{}: {}", target.url, e));
        }
    }
}

fn describe_images(images: &[ImageOutcome]) -> String {
    let with_text = images
        .iter()
        .filter(|i| i.ocr_status().is_success())
        .count();
    format!("{} images, {} with text", images.len(), with_text)
}
