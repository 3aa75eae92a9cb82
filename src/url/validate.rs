use crate::UrlError;
use url::Url;

/// Longest URL accepted for fetching
pub const MAX_URL_LENGTH: usize = 2048;

/// Characters that must be percent-encoded before a URL is accepted
const INVALID_CHARS: &[char] = &['<', '>', '{', '}', '|', '\\', '^', '~', '[', ']', '`'];

/// Validates a target URL and parses it
///
/// The input is trimmed first. A URL is accepted when:
/// - the scheme is `http` or `https`
/// - it has a host containing a dot (or the host is `localhost`)
/// - it is at most 2048 characters long
/// - it contains no spaces and none of `<>{}|\^~[]` or backtick
/// - its path has no empty segments (`//`)
///
/// # Arguments
///
/// * `raw` - The URL string as supplied by the user or the store
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The reason the URL was rejected
///
/// # Examples
///
/// ```
/// use pagesift::url::validate_url;
///
/// assert!(validate_url("https://example.com/about").is_ok());
/// assert!(validate_url("ftp://example.com/").is_err());
/// assert!(validate_url("https://exa mple.com/").is_err());
/// ```
pub fn validate_url(raw: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    if raw.len() > MAX_URL_LENGTH {
        return Err(UrlError::TooLong {
            len: raw.len(),
            max: MAX_URL_LENGTH,
        });
    }

    // The parser would silently percent-encode these, so check the raw text
    if raw.contains(' ') {
        return Err(UrlError::InvalidCharacter(' '));
    }
    if let Some(c) = raw.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(UrlError::InvalidCharacter(c));
    }

    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    if host.len() < 3 || (!host.contains('.') && host != "localhost") {
        return Err(UrlError::Malformed(format!(
            "invalid domain format: '{}'",
            host
        )));
    }

    if url.path().contains("//") {
        return Err(UrlError::Malformed(
            "path contains consecutive slashes".to_string(),
        ));
    }

    Ok(url)
}
