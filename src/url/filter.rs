use crate::config::FilterConfig;
use crate::url::matcher::matches_wildcard;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::{Host, Url};

/// Decides whether a discovered URL may be followed
///
/// Rules, in order:
///
/// 1. Exclusion wins: a URL carrying any excluded query parameter, or
///    matching any exclude regex, is rejected even if an include rule
///    also matches.
/// 2. If include parameters are set, the URL must carry at least one.
/// 3. If include regexes are set, the URL must match at least one.
/// 4. Without include rules everything not excluded passes.
///
/// Parameters are matched on query keys; regexes on the full URL string.
///
/// # Examples
///
/// ```
/// use trawl::url::passes_filters;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/list?sort=asc").unwrap();
/// assert!(!passes_filters(&url, &[], &["sort".to_string()], &[], &[]));
/// assert!(passes_filters(&url, &[], &["page".to_string()], &[], &[]));
/// ```
pub fn passes_filters(
    url: &Url,
    include_params: &[String],
    exclude_params: &[String],
    include_regex: &[Regex],
    exclude_regex: &[Regex],
) -> bool {
    let keys: HashSet<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    let url_str = url.as_str();

    if exclude_params.iter().any(|p| keys.contains(p)) {
        return false;
    }

    if exclude_regex.iter().any(|re| re.is_match(url_str)) {
        return false;
    }

    if !include_params.is_empty() && !include_params.iter().any(|p| keys.contains(p)) {
        return false;
    }

    if !include_regex.is_empty() && !include_regex.iter().any(|re| re.is_match(url_str)) {
        return false;
    }

    true
}

/// Precompiled filter rules for one crawl job
#[derive(Debug, Clone)]
pub struct UrlFilter {
    include_params: Vec<String>,
    exclude_params: Vec<String>,
    include_regex: Vec<Regex>,
    exclude_regex: Vec<Regex>,
    allowed_domains: Vec<String>,
}

impl UrlFilter {
    /// Compiles the job's filter rules
    ///
    /// # Arguments
    ///
    /// * `config` - The job's filter configuration
    /// * `seeds` - Normalized seed URLs; when the configuration names no
    ///   domains, each seed host and its subdomains are allowed
    pub fn new(config: &FilterConfig, seeds: &[Url]) -> Result<Self, ConfigError> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>, ConfigError> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        ConfigError::InvalidPattern(format!("Invalid regex '{}': {}", p, e))
                    })
                })
                .collect()
        };

        let allowed_domains = if config.allowed_domains.is_empty() {
            let mut hosts: Vec<String> = seeds.iter().filter_map(seed_domain).collect();
            hosts.sort();
            hosts.dedup();
            hosts
        } else {
            config
                .allowed_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect()
        };

        Ok(Self {
            include_params: config.include_url_params.clone(),
            exclude_params: config.exclude_url_params.clone(),
            include_regex: compile(&config.include_url_regex)?,
            exclude_regex: compile(&config.exclude_url_regex)?,
            allowed_domains,
        })
    }

    /// Returns true if the URL's host is within the allowed domains
    pub fn is_allowed_domain(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self
                .allowed_domains
                .iter()
                .any(|pattern| matches_wildcard(pattern, host)),
            None => false,
        }
    }

    /// Returns true if a discovered URL may be enqueued
    pub fn passes(&self, url: &Url) -> bool {
        self.is_allowed_domain(url)
            && passes_filters(
                url,
                &self.include_params,
                &self.exclude_params,
                &self.include_regex,
                &self.exclude_regex,
            )
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }
}

/// Default allowed-domain pattern for a seed
///
/// Named hosts allow their subdomains (`example.com` -> `*.example.com`);
/// IP addresses only match themselves.
fn seed_domain(seed: &Url) -> Option<String> {
    match seed.host()? {
        Host::Domain(domain) => Some(format!("*.{}", domain.to_lowercase())),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(format!("[{}]", addr)),
    }
}
