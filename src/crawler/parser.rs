//! HTML parser for extracting links and page summaries
//!
//! This module handles parsing fetched HTML to extract:
//! - Links to follow (from `<a>` tags and canonical links)
//! - Page title, meta description, h1 headings and canonical URL

use crate::crawler::fetcher::FetchResult;
use crate::url::resolve_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// The page title (from `<title>`)
    pub title: Option<String>,

    /// `<meta name="description">` content
    pub meta_description: Option<String>,

    /// Text of every `<h1>`, in document order
    pub h1: Vec<String>,

    /// Absolute `<link rel="canonical">` target
    pub canonical: Option<String>,

    /// All links found on the page (absolute, normalized, unique)
    pub links: Vec<String>,
}

/// Returns true if a Content-Type header denotes HTML
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "text/html" || mime == "application/xhtml+xml"
        })
        .unwrap_or(false)
}

/// Returns the candidate links of a fetch result
///
/// Only successful, HTML-typed responses are parsed; anything else yields an
/// empty sequence. Links are resolved against the final URL after redirects.
pub fn extract(result: &FetchResult) -> Vec<String> {
    parse_result(result)
        .map(|parsed| parsed.links)
        .unwrap_or_default()
}

/// Parses a fetch result if it is a successful HTML response
pub fn parse_result(result: &FetchResult) -> Option<ParsedPage> {
    match result {
        FetchResult::Success {
            final_url,
            content_type,
            body,
            ..
        } if is_html(content_type.as_deref()) => Some(parse_html(body, final_url)),
        _ => None,
    }
}

/// Parses HTML content and extracts links and the page summary
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only references
/// - Anything that does not resolve to an http(s) URL
///
/// `rel="nofollow"` links are followed.
///
/// # Example
///
/// ```
/// use trawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let canonical = select_first(&document, "link[rel='canonical'][href]")
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve_link(href, base_url));

    ParsedPage {
        title: select_first(&document, "title").and_then(|el| element_text(&el)),
        meta_description: select_first(&document, "meta[name='description'][content]")
            .and_then(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty()),
        h1: select_all(&document, "h1")
            .iter()
            .filter_map(element_text)
            .collect(),
        links: extract_links(&document, base_url, canonical.as_deref()),
        canonical,
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn select_all<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Collapses whitespace in an element's text; empty text is `None`
fn element_text(element: &ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn extract_links(document: &Html, base_url: &Url, canonical: Option<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in select_all(document, "a[href]") {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(link) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    if let Some(canonical) = canonical {
        if seen.insert(canonical.to_string()) {
            links.push(canonical.to_string());
        }
    }

    links
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    match resolve_url(href, base_url) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!("Skipping link {:?} on {}: {}", href, base_url, e);
            None
        }
    }
}
