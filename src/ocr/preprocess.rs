//! Image cleanup ahead of text recognition
//!
//! Recognition does better on large, high-contrast grayscale input, so every
//! image is decoded, converted to grayscale, upscaled when small and
//! optionally sharpened before being re-encoded as PNG for the engine.

use std::io::Cursor;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::config::OcrConfig;
use crate::ocr::format::decode_raster;
use crate::ocr::OcrEngineError;

/// Images narrower or shorter than this are upscaled 2x
pub const SMALL_IMAGE_PX: u32 = 300;

/// With fast processing on, images this large on either side are never resized
pub const LARGE_IMAGE_PX: u32 = 1000;

// adjust_contrast scales by ((100 + c) / 100)^2, so this doubles contrast
const CONTRAST_BOOST: f32 = 41.42;
const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 1;

/// Preprocessing switches, usually taken from `[ocr]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessing {
    pub enhancement: bool,
    pub fast_processing: bool,
}

impl Default for Preprocessing {
    fn default() -> Self {
        Self {
            enhancement: true,
            fast_processing: false,
        }
    }
}

impl Preprocessing {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            enhancement: config.enhancement,
            fast_processing: config.fast_processing,
        }
    }

    /// Decodes `bytes`, cleans the image up and returns it encoded as PNG
    ///
    /// Undecodable and entirely blank images are processing errors.
    pub fn prepare(&self, bytes: &[u8]) -> Result<Vec<u8>, OcrEngineError> {
        let img = decode_raster(bytes).map_err(OcrEngineError::Processing)?;

        if is_blank(&img) {
            return Err(OcrEngineError::Processing(
                "Image appears to be empty or corrupted".to_string(),
            ));
        }

        let prepared = self.apply(img);

        let mut buf = Cursor::new(Vec::new());
        prepared
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| OcrEngineError::Processing(format!("Failed to encode image: {}", e)))?;
        Ok(buf.into_inner())
    }

    fn apply(&self, img: DynamicImage) -> DynamicImage {
        let mut gray = img.grayscale();
        let (width, height) = (gray.width(), gray.height());

        let may_resize =
            !self.fast_processing || (width < LARGE_IMAGE_PX && height < LARGE_IMAGE_PX);
        if may_resize && (width < SMALL_IMAGE_PX || height < SMALL_IMAGE_PX) {
            gray = gray.resize_exact(width * 2, height * 2, FilterType::Lanczos3);
            tracing::debug!(
                "Upscaled image from {}x{} to {}x{}",
                width,
                height,
                gray.width(),
                gray.height()
            );
        } else if !may_resize {
            tracing::debug!("Skipping resize for large image ({}x{})", width, height);
        }

        if self.enhancement {
            gray = gray
                .adjust_contrast(CONTRAST_BOOST)
                .unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD);
        }

        gray
    }
}

/// True when the image has no area or every pixel is black
fn is_blank(img: &DynamicImage) -> bool {
    img.width() == 0 || img.height() == 0 || img.to_rgb8().pixels().all(|p| p.0 == [0, 0, 0])
}
