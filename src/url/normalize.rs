use crate::UrlError;
use url::Url;

/// Normalizes a URL into the canonical form used for deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Reject URLs without a host
/// 4. Lowercase the scheme and host
/// 5. Strip the port when it is the scheme's default
/// 6. Remove the fragment (everything after #)
/// 7. Remove an empty query string (trailing ?)
///
/// Dot segments are resolved and an empty path becomes `/` during parsing.
/// Query parameters keep their order: `?b=1&a=2` and `?a=2&b=1` may name
/// different resources.
///
/// The result is a fixed point: normalizing an already normalized URL
/// returns it unchanged.
///
/// # Examples
///
/// ```
/// use trawl::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/page#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Resolves a (possibly relative) reference against a base URL and normalizes it
///
/// # Examples
///
/// ```
/// use trawl::url::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/intro").unwrap();
/// let url = resolve_url("../about#team", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn resolve_url(href: &str, base: &Url) -> Result<Url, UrlError> {
    let url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Applies the canonicalization rules to an already parsed URL
fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    // The parser already lowercases the scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingHost)?
        .to_string();

    let lowered = host.to_lowercase();
    if lowered != host {
        url.set_host(Some(&lowered))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    // Url drops default ports while parsing; this covers ports set afterwards
    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed("Failed to strip default port".to_string()))?;
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}
