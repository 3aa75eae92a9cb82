//! Image format detection
//!
//! Raster formats are recognised by the `image` crate; SVG is not something
//! it decodes, so vector markup gets a small textual check of its own.

use std::io::Cursor;

use image::{DynamicImage, ImageReader};

/// What a downloaded image turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Raster(image::ImageFormat),
    Svg,
    Unknown,
}

impl ImageFormat {
    /// File extension including the leading dot
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Raster(format) => raster_extension(*format),
            Self::Svg => Some(".svg"),
            Self::Unknown => None,
        }
    }

    /// Returns true for raster formats a text recognizer can read
    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Raster(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Raster(format) => format.extensions_str().first().copied().unwrap_or("raster"),
            Self::Svg => "svg",
            Self::Unknown => "unknown",
        }
    }
}

fn raster_extension(format: image::ImageFormat) -> Option<&'static str> {
    use image::ImageFormat as F;

    let ext = match format {
        F::Png => ".png",
        F::Jpeg => ".jpg",
        F::Gif => ".gif",
        F::Bmp => ".bmp",
        F::Tiff => ".tiff",
        F::WebP => ".webp",
        F::Ico => ".ico",
        F::Avif => ".avif",
        _ => return None,
    };
    Some(ext)
}

/// Guesses the format of `bytes` from its header
///
/// Only the leading bytes are inspected; use [`decode_raster`] to confirm
/// the whole image is readable.
pub fn sniff_format(bytes: &[u8]) -> ImageFormat {
    match image::guess_format(bytes) {
        Ok(format) => ImageFormat::Raster(format),
        Err(_) if looks_like_svg(bytes) => ImageFormat::Svg,
        Err(_) => ImageFormat::Unknown,
    }
}

/// Decodes a raster image, failing on truncated or corrupt data
pub fn decode_raster(bytes: &[u8]) -> Result<DynamicImage, String> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?;

    if reader.format().is_none() {
        return Err("Could not detect image format".to_string());
    }

    reader
        .decode()
        .map_err(|e| format!("Failed to decode image: {}", e))
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}
