/// Checks if a host matches an allowed-domain pattern
///
/// Two kinds of patterns are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and any
///    subdomain at any depth
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use trawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "blog.example.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        assert!(matches_wildcard("a.test", "a.test"));
        assert!(!matches_wildcard("a.test", "b.test"));
        assert!(!matches_wildcard("a.test", "www.a.test"));
    }

    #[test]
    fn test_ip_hosts() {
        assert!(matches_wildcard("127.0.0.1", "127.0.0.1"));
        assert!(!matches_wildcard("127.0.0.1", "127.0.0.10"));
    }

    #[test]
    fn test_wildcard_subdomains() {
        assert!(matches_wildcard("*.a.test", "a.test"));
        assert!(matches_wildcard("*.a.test", "www.a.test"));
        assert!(matches_wildcard("*.a.test", "deep.nested.a.test"));
    }

    #[test]
    fn test_wildcard_rejects_lookalikes() {
        assert!(!matches_wildcard("*.a.test", "evila.test"));
        assert!(!matches_wildcard("*.a.test", "a.test.evil"));
        assert!(!matches_wildcard("*.a.test", ""));
    }
}
