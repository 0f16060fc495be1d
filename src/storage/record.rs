use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The outcome of fetching one URL
///
/// Written once to the record log and never modified afterwards. A record
/// with `error` set is still a fetched page: it counts against the budget and
/// is never retried by a later crawl step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Canonical URL that was requested
    pub url: String,

    /// URL of the response after redirects, if a response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,

    /// HTTP status code, if a response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Link hops from the nearest seed
    pub depth: u32,

    /// Page the URL was discovered on (absent for seeds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,

    /// Response headers, lowercase names
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,

    #[serde(default)]
    pub h1: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,

    /// Body size in bytes
    #[serde(default)]
    pub size: u64,

    /// Absolute links found on the page, in document order
    #[serde(default)]
    pub links: Vec<String>,

    /// When the fetch completed
    pub crawl_time: DateTime<Utc>,

    /// Wall time of the fetch, retries included (milliseconds)
    pub elapsed_ms: u64,

    /// Why the page could not be fetched or was not accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    /// Creates an empty record for a URL; the fetcher fills in the rest
    pub fn new(url: impl Into<String>, depth: u32, referrer: Option<String>) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            status: None,
            depth,
            referrer,
            headers: BTreeMap::new(),
            content_type: None,
            title: None,
            meta_description: None,
            h1: Vec::new(),
            canonical: None,
            size: 0,
            links: Vec::new(),
            crawl_time: Utc::now(),
            elapsed_ms: 0,
            error: None,
        }
    }

    /// Returns true if the page was fetched without error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Marks the record as failed with the given reason
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_line_shape() {
        let mut record = PageRecord::new("http://a.test/", 0, None);
        record.status = Some(200);
        record.title = Some("Home".to_string());

        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"url\":\"http://a.test/\""));
        assert!(!line.contains("\"error\""));
        assert!(!line.contains("\"referrer\""));

        let back: PageRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_with_error() {
        let record = PageRecord::new("http://a.test/x", 1, Some("http://a.test/".to_string()))
            .with_error("HTTP 404");
        assert!(!record.is_success());
        assert_eq!(record.error.as_deref(), Some("HTTP 404"));
    }

    #[test]
    fn test_body_newlines_stay_on_one_line() {
        let mut record = PageRecord::new("http://a.test/", 0, None);
        record.title = Some("multi\nline\r\ntitle".to_string());
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(line.lines().count(), 1);
    }
}
