//! HTML parser for extracting page content
//!
//! This module handles parsing rendered HTML to extract:
//! - The page title
//! - Visible text (script, style and similar content excluded)
//! - Image references, resolved to absolute URLs

use crate::url::resolve_image_src;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text content is never visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text, one line per text block, whitespace collapsed
    pub visible_text: String,

    /// Image references in document order, without duplicates
    pub image_refs: Vec<String>,
}

/// Parses rendered HTML
///
/// # Image Extraction Rules
///
/// - `<img src>` is used; `data-src` is the fallback for lazy-loaded images
/// - Relative sources are resolved against `base_url`
/// - `data:` sources are kept as-is
/// - `javascript:`, `blob:` and non-HTTP(S) sources are dropped
/// - The first occurrence of each reference wins
///
/// # Example
///
/// ```
/// use pagesift::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Shop</title></head><body><p>Hello</p><img src="/a.png"></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &base_url);
/// assert_eq!(parsed.title, Some("Shop".to_string()));
/// assert_eq!(parsed.visible_text, "Hello");
/// assert_eq!(parsed.image_refs, vec!["https://example.com/a.png".to_string()]);
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        visible_text: extract_visible_text(&document),
        image_refs: extract_image_refs(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects the text of every text node not inside a hidden element
fn extract_visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut blocks = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| HIDDEN_ELEMENTS.contains(&element.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let block = collapse_whitespace(text);
        if !block.is_empty() {
            blocks.push(block);
        }
    }

    blocks.join("\n")
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_image_refs(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    let Ok(img_selector) = Selector::parse("img") else {
        return refs;
    };

    for element in document.select(&img_selector) {
        let src = element
            .value()
            .attr("src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| element.value().attr("data-src"));

        if let Some(absolute) = src.and_then(|s| resolve_image_src(s, base_url)) {
            if seen.insert(absolute.clone()) {
                refs.push(absolute);
            }
        }
    }

    refs
}
