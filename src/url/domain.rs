use sha2::{Digest, Sha256};
use url::Url;

/// Extracts the lowercase host from a URL
///
/// This is the key the rate limiter paces on.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use pagesift::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.com:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Turns a host into a string that is safe as a directory name
///
/// Lowercases, drops a leading `www.`, and replaces dots, colons and other
/// filesystem-hostile characters with underscores.
pub fn normalize_hostname(host: &str) -> String {
    let lower = host.to_lowercase();
    let trimmed = lower.strip_prefix("www.").unwrap_or(&lower);

    trimmed
        .chars()
        .map(|c| match c {
            '.' | '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Returns the first 8 hex characters of the SHA-256 digest of `input`
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

/// Derives the per-target directory name used in the output layout
///
/// A site root (`/` with no query) maps to its normalized hostname so
/// homepages stay readable. Any deeper page gets the hostname plus a short
/// hash of the URL without its fragment, so two pages of one host never share
/// a directory.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use pagesift::url::target_identity;
///
/// let home = Url::parse("https://www.Example.com/").unwrap();
/// assert_eq!(target_identity(&home), "example_com");
///
/// let deep = Url::parse("https://example.com/about").unwrap();
/// assert!(target_identity(&deep).starts_with("example_com_"));
/// ```
pub fn target_identity(url: &Url) -> String {
    let host = url
        .host_str()
        .map(normalize_hostname)
        .unwrap_or_else(|| "unknown_host".to_string());

    let mut host_part = host;
    if let Some(port) = url.port() {
        host_part.push_str(&format!("_{}", port));
    }

    if url.path() == "/" && url.query().is_none() {
        return host_part;
    }

    let mut canonical = url.clone();
    canonical.set_fragment(None);
    format!("{}_{}", host_part, short_hash(canonical.as_str()))
}
