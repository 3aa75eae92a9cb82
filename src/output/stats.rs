//! Run statistics
//!
//! This module folds per-URL results into the [`RunSummary`] written as
//! `summary.json` and printed at the end of a CLI run.

use crate::crawler::ScrapeAttemptResult;
use crate::ocr::OcrStatus;
use crate::state::ScrapeStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Count of images per OCR status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OcrCounts {
    pub success: u64,
    pub no_text_found: u64,
    pub error_unsupported_format: u64,
    pub error_processing: u64,
    pub error_timeout: u64,
    pub error_download_failed: u64,
    pub skipped: u64,
}

impl OcrCounts {
    pub fn record(&mut self, status: OcrStatus) {
        *self.slot(status) += 1;
    }

    pub fn get(&self, status: OcrStatus) -> u64 {
        match status {
            OcrStatus::Success => self.success,
            OcrStatus::NoTextFound => self.no_text_found,
            OcrStatus::ErrorUnsupportedFormat => self.error_unsupported_format,
            OcrStatus::ErrorProcessing => self.error_processing,
            OcrStatus::ErrorTimeout => self.error_timeout,
            OcrStatus::ErrorDownloadFailed => self.error_download_failed,
            OcrStatus::Skipped => self.skipped,
        }
    }

    pub fn total(&self) -> u64 {
        OcrStatus::all_statuses().iter().map(|s| self.get(*s)).sum()
    }

    fn slot(&mut self, status: OcrStatus) -> &mut u64 {
        match status {
            OcrStatus::Success => &mut self.success,
            OcrStatus::NoTextFound => &mut self.no_text_found,
            OcrStatus::ErrorUnsupportedFormat => &mut self.error_unsupported_format,
            OcrStatus::ErrorProcessing => &mut self.error_processing,
            OcrStatus::ErrorTimeout => &mut self.error_timeout,
            OcrStatus::ErrorDownloadFailed => &mut self.error_download_failed,
            OcrStatus::Skipped => &mut self.skipped,
        }
    }
}

/// A URL that ended in `failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUrl {
    pub url: String,
    pub error: String,
}

/// Which tracker ran and what went wrong with it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackingReport {
    pub backend: String,
    /// Durable store errors; none of them stopped the run
    pub errors: Vec<String>,
}

/// Summary of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub run_started_at: DateTime<Utc>,
    pub run_ended_at: Option<DateTime<Utc>>,
    pub total_urls: u64,
    pub attempted: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub images_total: u64,
    pub ocr_status_counts: OcrCounts,
    /// `completed / attempted`, 0 when nothing was attempted
    pub success_rate: f64,
    pub cancelled: bool,
    pub failed_urls: Vec<FailedUrl>,
    pub tracking: TrackingReport,
}

impl RunSummary {
    pub fn new(
        run_id: impl Into<String>,
        total_urls: usize,
        tracking_backend: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            run_started_at: started_at,
            run_ended_at: None,
            total_urls: total_urls as u64,
            attempted: 0,
            completed: 0,
            failed: 0,
            skipped: 0,
            images_total: 0,
            ocr_status_counts: OcrCounts::default(),
            success_rate: 0.0,
            cancelled: false,
            failed_urls: Vec::new(),
            tracking: TrackingReport {
                backend: tracking_backend.to_string(),
                errors: Vec::new(),
            },
        }
    }

    /// Counts a URL skipped because it already completed
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_tracking_error(&mut self, message: String) {
        self.tracking.errors.push(message);
    }

    /// Folds one attempted URL into the totals
    pub fn record(&mut self, result: &ScrapeAttemptResult) {
        self.attempted += 1;

        match result.status {
            ScrapeStatus::Completed => self.completed += 1,
            ScrapeStatus::Failed | ScrapeStatus::Pending => {
                self.failed += 1;
                self.failed_urls.push(FailedUrl {
                    url: result.url.clone(),
                    error: result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }
        }

        for image in &result.image_results {
            self.images_total += 1;
            self.ocr_status_counts.record(image.ocr_status());
        }

        self.success_rate = self.completed as f64 / self.attempted as f64;
    }

    pub fn finish(&mut self, ended_at: DateTime<Utc>, cancelled: bool) {
        self.run_ended_at = Some(ended_at);
        self.cancelled = cancelled;
    }

    /// Run length in seconds, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.run_ended_at
            .map(|ended| (ended - self.run_started_at).num_seconds())
    }
}

/// Prints the summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &RunSummary) {
    println!("=== Run Summary: {} ===\n", summary.run_id);

    println!("URLs:");
    println!("  Total: {}", summary.total_urls);
    println!("  Attempted: {}", summary.attempted);
    println!("  Completed: {}", summary.completed);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped (already completed): {}", summary.skipped);
    if let Some(seconds) = summary.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    if summary.cancelled {
        println!("  Run was cancelled before all URLs were attempted");
    }
    println!();

    if summary.images_total > 0 {
        println!("Images ({}):", summary.images_total);
        for status in OcrStatus::all_statuses() {
            let count = summary.ocr_status_counts.get(status);
            if count > 0 {
                let percentage = (count as f64 / summary.images_total as f64) * 100.0;
                println!("  {}: {} ({:.1}%)", status, count, percentage);
            }
        }
        println!();
    }

    if !summary.failed_urls.is_empty() {
        println!("Failed URLs ({}):", summary.failed_urls.len());
        for failed in &summary.failed_urls {
            println!("  - {}: {}", failed.url, failed.error);
        }
        println!();
    }

    println!("Tracking: {}", summary.tracking.backend);
    if !summary.tracking.errors.is_empty() {
        println!("  Store errors ({}):", summary.tracking.errors.len());
        for error in &summary.tracking.errors {
            println!("  - {}", error);
        }
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} URLs completed)",
        summary.success_rate * 100.0,
        summary.completed,
        summary.attempted
    );
}
