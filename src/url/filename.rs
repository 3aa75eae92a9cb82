use crate::url::domain::short_hash;
use std::path::Path;

/// Longest stem kept before the hash suffix
const MAX_STEM_LENGTH: usize = 100;

/// Extension used when neither the URL nor the bytes reveal one
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

/// Builds a filesystem-safe, collision-resistant filename for an image reference
///
/// The result is `<stem>_<hash8><ext>` where the stem comes from the last path
/// segment, the hash from the full reference, and the extension from the URL
/// path, then `fallback_ext`, then `.jpg`. `data:` references use the stem
/// `image` and the extension of their media type.
///
/// # Arguments
///
/// * `reference` - Absolute image URL or `data:` URL
/// * `fallback_ext` - Extension (with dot) derived from sniffing the bytes
///
/// # Examples
///
/// ```
/// use pagesift::url::safe_filename;
///
/// let name = safe_filename("https://cdn.example.com/img/logo.png?v=2", None);
/// assert!(name.starts_with("logo_"));
/// assert!(name.ends_with(".png"));
/// ```
pub fn safe_filename(reference: &str, fallback_ext: Option<&str>) -> String {
    let hash = short_hash(reference);

    if let Some(rest) = reference.strip_prefix("data:") {
        let media_type = rest.split([';', ',']).next().unwrap_or("");
        let ext = extension_for_media_type(media_type)
            .or(fallback_ext)
            .unwrap_or(DEFAULT_IMAGE_EXTENSION);
        return format!("image_{}{}", hash, ext);
    }

    let path = match url::Url::parse(reference) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => reference.to_string(),
    };

    let last_segment = path.rsplit('/').next().unwrap_or("");
    let as_path = Path::new(last_segment);

    let url_ext = as_path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_lowercase()));

    let ext = url_ext.unwrap_or_else(|| {
        fallback_ext
            .unwrap_or(DEFAULT_IMAGE_EXTENSION)
            .to_string()
    });

    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_stem)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());

    format!("{}_{}{}", stem, hash, ext)
}

/// Replaces filesystem-hostile characters, trims dots and spaces, truncates
fn sanitize_stem(stem: &str) -> String {
    let replaced: String = stem
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');

    if trimmed.chars().count() <= MAX_STEM_LENGTH {
        return trimmed.to_string();
    }

    let head: String = trimmed.chars().take(MAX_STEM_LENGTH).collect();
    match head.rfind('_') {
        Some(cut) if cut > 0 => head[..cut].to_string(),
        _ => head,
    }
}

fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    match media_type.to_ascii_lowercase().as_str() {
        "image/png" => Some(".png"),
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/bmp" => Some(".bmp"),
        "image/tiff" => Some(".tiff"),
        "image/svg+xml" => Some(".svg"),
        _ => None,
    }
}
