//! Text recognition through the `tesseract` command line tool
//!
//! The image is cleaned up (see [`Preprocessing`]), re-encoded as PNG and
//! piped to `tesseract stdin stdout -l <languages>`; whatever the tool prints
//! is the extracted text.

use crate::config::OcrConfig;
use crate::ocr::{sniff_format, OcrEngine, OcrEngineError, Preprocessing};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// [`OcrEngine`] that shells out to Tesseract
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: String,
    languages: String,
    preprocessing: Preprocessing,
}

impl TesseractEngine {
    pub fn new(program: impl Into<String>, languages: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            languages: languages.into(),
            preprocessing: Preprocessing::default(),
        }
    }

    pub fn with_preprocessing(mut self, preprocessing: Preprocessing) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_path.clone(), config.languages.clone())
            .with_preprocessing(Preprocessing::from_config(config))
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrEngineError> {
        let format = sniff_format(image);
        if !format.is_raster() {
            return Err(OcrEngineError::UnsupportedFormat(format.name().to_string()));
        }

        let preprocessing = self.preprocessing;
        let raw = image.to_vec();
        let prepared = tokio::task::spawn_blocking(move || preprocessing.prepare(&raw))
            .await
            .map_err(|e| OcrEngineError::Processing(format!("preprocessing aborted: {}", e)))??;

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", self.languages.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                OcrEngineError::Processing(format!("failed to start {}: {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&prepared)
                .await
                .map_err(|e| OcrEngineError::Processing(format!("failed to send image: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrEngineError::Processing(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrEngineError::Processing(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
