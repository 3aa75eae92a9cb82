//! Deterministic artifact layout
//!
//! Everything a run produces lives under `<root>/<run_id>`:
//!
//! ```text
//! <run_id>/
//!   summary.json
//!   pages/<target>/page.html
//!   pages/<target>/text.txt
//!   pages/<target>/text.json
//!   pages/<target>/url.txt
//!   pages/<target>/ocr/summary.json
//!   pages/<target>/ocr/ocr_001_<image_file>.json
//!   images/<target>/<image_file>
//! ```
//!
//! `<target>` is the target identity of the page URL.

use crate::config::ScrapeMode;
use crate::ocr::{sniff_format, ImageOutcome, OcrStatus};
use crate::output::{OutputError, OutputResult, RunSummary};
use crate::url::safe_filename;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Builds the run directory name from an optional run name
///
/// Keeps alphanumerics, spaces, `-` and `_` from the name, turns spaces into
/// underscores and appends `_YYYYmmdd_HHMMSS`. Without a usable name the id is
/// the timestamp alone.
pub fn run_id_for(run_name: Option<&str>, now: &DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();

    let safe: String = run_name
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_");

    if safe.is_empty() {
        stamp
    } else {
        format!("{}_{}", safe, stamp)
    }
}

/// Everything the writer needs to persist one page
#[derive(Debug)]
pub struct PageArtifacts<'a> {
    pub url: &'a str,
    pub hostname: &'a str,
    pub html: &'a str,
    pub visible_text: &'a str,
    pub mode: ScrapeMode,
    pub images: &'a [ImageOutcome],
}

/// Where a page's artifacts ended up
#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub html_path: Option<PathBuf>,
    pub text_path: Option<PathBuf>,
    pub structured_path: Option<PathBuf>,
    pub ocr_summary_path: Option<PathBuf>,
    /// One entry per artifact that could not be written
    pub notes: Vec<String>,
}

impl WriteReport {
    /// True when page.html, text.txt and text.json were all written
    pub fn primary_ok(&self) -> bool {
        self.html_path.is_some() && self.text_path.is_some() && self.structured_path.is_some()
    }
}

#[derive(Serialize)]
struct PageTextDocument<'a> {
    url: &'a str,
    hostname: &'a str,
    text: &'a str,
    text_length: usize,
    word_count: usize,
    ocr_results_count: usize,
    images_dir: String,
    failed_images_download: Vec<&'a str>,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct OcrImageDocument<'a> {
    url: &'a str,
    hostname: &'a str,
    timestamp: DateTime<Utc>,
    image_url: &'a str,
    image_path: Option<&'a Path>,
    ocr_status: OcrStatus,
    ocr_text: &'a str,
    ocr_text_length: usize,
    ocr_text_word_count: usize,
}

#[derive(Serialize)]
struct OcrSummaryDocument<'a> {
    url: &'a str,
    hostname: &'a str,
    timestamp: DateTime<Utc>,
    total_ocr_text: String,
    total_ocr_text_length: usize,
    total_ocr_word_count: usize,
    image_count: usize,
    successful_ocr_count: usize,
    success_rate: f64,
    image_summaries: Vec<&'a ImageOutcome>,
}

/// Writes artifacts for one run
#[derive(Debug, Clone)]
pub struct OutputWriter {
    run_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(root: &Path, run_id: &str) -> Self {
        Self {
            run_dir: root.join(run_id),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn pages_dir(&self, target: &str) -> PathBuf {
        self.run_dir.join("pages").join(target)
    }

    pub fn images_dir(&self, target: &str) -> PathBuf {
        self.run_dir.join("images").join(target)
    }

    /// Creates the run directory
    pub fn create_run_dir(&self) -> OutputResult<()> {
        fs::create_dir_all(&self.run_dir).map_err(|e| OutputError::io(&self.run_dir, e))
    }

    /// Persists one image and returns its path
    ///
    /// The extension comes from the reference, then from the image bytes.
    pub fn write_image(&self, target: &str, reference: &str, bytes: &[u8]) -> OutputResult<PathBuf> {
        let dir = self.images_dir(target);
        fs::create_dir_all(&dir).map_err(|e| OutputError::io(&dir, e))?;

        let name = safe_filename(reference, sniff_format(bytes).extension());
        let path = dir.join(name);
        fs::write(&path, bytes).map_err(|e| OutputError::io(&path, e))?;

        tracing::trace!("Saved image {} to {}", reference, path.display());
        Ok(path)
    }

    /// Writes every artifact for one page
    ///
    /// Never fails as a whole: each artifact that cannot be written becomes a
    /// note on the report.
    pub fn write_page(&self, target: &str, page: &PageArtifacts<'_>) -> WriteReport {
        let mut report = WriteReport::default();
        let dir = self.pages_dir(target);

        if let Err(e) = fs::create_dir_all(&dir) {
            report
                .notes
                .push(OutputError::io(&dir, e).to_string());
            return report;
        }

        let now = Utc::now();
        let text = if page.mode.wants_text() {
            page.visible_text
        } else {
            ""
        };

        report.html_path = note_err(&mut report.notes, write_text(&dir.join("page.html"), page.html));
        report.text_path = note_err(&mut report.notes, write_text(&dir.join("text.txt"), text));

        let document = PageTextDocument {
            url: page.url,
            hostname: page.hostname,
            text,
            text_length: text.chars().count(),
            word_count: word_count(text),
            ocr_results_count: page
                .images
                .iter()
                .filter(|i| i.ocr_status().engine_invoked())
                .count(),
            images_dir: self.images_dir(target).display().to_string(),
            failed_images_download: page
                .images
                .iter()
                .filter(|i| i.ocr_status() == OcrStatus::ErrorDownloadFailed)
                .map(|i| i.source_url())
                .collect(),
            timestamp: now,
        };
        report.structured_path =
            note_err(&mut report.notes, write_json(&dir.join("text.json"), &document));

        note_err(&mut report.notes, write_text(&dir.join("url.txt"), page.url));

        if page.mode.wants_ocr() {
            let summary = self.write_ocr(&dir.join("ocr"), page, now, &mut report.notes);
            report.ocr_summary_path = note_err(&mut report.notes, summary);
        }

        for note in &report.notes {
            tracing::warn!("Artifact write for {} failed: {}", page.url, note);
        }

        report
    }

    /// Writes `summary.json` for the run
    pub fn write_run_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf> {
        let path = self.run_dir.join("summary.json");
        write_json(&path, summary)
    }

    /// Writes one JSON file per classified image plus `ocr/summary.json`
    ///
    /// A per-image file that cannot be written is noted and skipped.
    fn write_ocr(
        &self,
        dir: &Path,
        page: &PageArtifacts<'_>,
        now: DateTime<Utc>,
        notes: &mut Vec<String>,
    ) -> OutputResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| OutputError::io(dir, e))?;

        let classified: Vec<&ImageOutcome> = page
            .images
            .iter()
            .filter(|i| i.ocr_status().engine_invoked())
            .collect();

        for (index, image) in classified.iter().enumerate() {
            let text = image.extracted_text().unwrap_or("");
            let document = OcrImageDocument {
                url: page.url,
                hostname: page.hostname,
                timestamp: now,
                image_url: image.source_url(),
                image_path: image.local_path(),
                ocr_status: image.ocr_status(),
                ocr_text: text,
                ocr_text_length: text.chars().count(),
                ocr_text_word_count: word_count(text),
            };
            let name = format!(
                "ocr_{:03}_{}.json",
                index + 1,
                safe_filename(image.source_url(), None)
            );
            note_err(notes, write_json(&dir.join(name), &document));
        }

        let texts: Vec<&str> = classified.iter().filter_map(|i| i.extracted_text()).collect();
        let total_ocr_text = texts.join("\n\n");
        let successful = texts.len();

        let summary = OcrSummaryDocument {
            url: page.url,
            hostname: page.hostname,
            timestamp: now,
            total_ocr_text_length: total_ocr_text.chars().count(),
            total_ocr_word_count: word_count(&total_ocr_text),
            total_ocr_text,
            image_count: classified.len(),
            successful_ocr_count: successful,
            success_rate: if classified.is_empty() {
                0.0
            } else {
                successful as f64 / classified.len() as f64
            },
            image_summaries: page.images.iter().collect(),
        };

        let path = dir.join("summary.json");
        write_json(&path, &summary)?;
        tracing::debug!(
            "Saved OCR results for {} ({} images) to {}",
            page.url,
            classified.len(),
            path.display()
        );
        Ok(path)
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn write_text(path: &Path, content: &str) -> OutputResult<PathBuf> {
    fs::write(path, content).map_err(|e| OutputError::io(path, e))?;
    Ok(path.to_path_buf())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<PathBuf> {
    let json = serde_json::to_string_pretty(value)?;
    write_text(path, &json)
}

fn note_err<T>(notes: &mut Vec<String>, result: OutputResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            notes.push(e.to_string());
            None
        }
    }
}
