//! URL handling module for Pagesift
//!
//! This module provides target URL validation, host extraction for pacing,
//! and the naming rules that map URLs onto the output directory layout.

mod domain;
mod filename;
mod validate;

pub use domain::{extract_host, normalize_hostname, short_hash, target_identity};
pub use filename::{safe_filename, DEFAULT_IMAGE_EXTENSION};
pub use validate::{validate_url, MAX_URL_LENGTH};

use url::Url;

/// Resolves an image `src` attribute against the page URL
///
/// Returns `None` for empty sources, fragments and non-image schemes.
/// `data:` references are returned unchanged; everything else must resolve
/// to an absolute `http`/`https` URL.
pub fn resolve_image_src(src: &str, base_url: &Url) -> Option<String> {
    let src = src.trim();

    if src.is_empty() || src.starts_with('#') {
        return None;
    }

    if src.starts_with("data:") {
        return Some(src.to_string());
    }

    if src.starts_with("javascript:") || src.starts_with("blob:") {
        return None;
    }

    match base_url.join(src) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
