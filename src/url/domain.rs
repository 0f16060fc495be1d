use url::Url;

/// Returns the key used to group requests by server
///
/// The key is the lowercase host plus the explicit port, if any, so two
/// servers on the same machine are scheduled independently.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use trawl::url::host_key;
///
/// let url = Url::parse("https://Example.COM/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns the robots.txt URL serving the given page
pub fn robots_url(url: &Url) -> Option<Url> {
    url.host_str()?;
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    Some(robots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key_default_port_omitted() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(host_key(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_host_key_distinguishes_ports() {
        let a = Url::parse("http://localhost:8000/").unwrap();
        let b = Url::parse("http://localhost:9000/").unwrap();
        assert_ne!(host_key(&a), host_key(&b));
    }

    #[test]
    fn test_robots_url() {
        let url = Url::parse("http://a.test:8080/deep/page?q=1#frag").unwrap();
        assert_eq!(
            robots_url(&url).unwrap().as_str(),
            "http://a.test:8080/robots.txt"
        );
    }
}
