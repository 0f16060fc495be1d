//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the job's user agent and timeout
//! - GET requests with redirects followed by reqwest (max 10 hops)
//! - Optional bounded retry with exponential backoff
//! - Error classification

use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum redirect hops before a fetch fails
pub const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// The server answered 2xx
    Success {
        /// Final URL after redirects
        final_url: Url,
        status: u16,
        headers: BTreeMap<String, String>,
        content_type: Option<String>,
        /// Body decoded as UTF-8 (lossy)
        body: String,
        /// Body size in bytes as received
        size: u64,
    },

    /// The server answered with a non-2xx status
    HttpError {
        final_url: Url,
        status: u16,
        headers: BTreeMap<String, String>,
        content_type: Option<String>,
    },

    /// No usable response (connection refused, DNS, timeout, redirect loop)
    NetworkError {
        error: String,
        timed_out: bool,
        retryable: bool,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if another attempt could produce a different result
    ///
    /// Network errors (except redirect failures), timeouts, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Success { .. } => false,
            Self::HttpError { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(status)
            }
            Self::NetworkError { retryable, .. } => *retryable,
        }
    }

    pub fn final_url(&self) -> Option<&Url> {
        match self {
            Self::Success { final_url, .. } | Self::HttpError { final_url, .. } => Some(final_url),
            Self::NetworkError { .. } => None,
        }
    }

    /// Describes the failure, if any, for the page record
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::HttpError { status, .. } => Some(match StatusCode::from_u16(*status) {
                Ok(code) => match code.canonical_reason() {
                    Some(reason) => format!("HTTP {} {}", status, reason),
                    None => format!("HTTP {}", status),
                },
                Err(_) => format!("HTTP {}", status),
            }),
            Self::NetworkError { error, .. } => Some(error.clone()),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use trawl::crawler::build_http_client;
///
/// let client = build_http_client("trawl/0.1", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(std::cmp::min(timeout, Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once
///
/// # Error Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | Success |
/// | Any other status | HttpError |
/// | Timeout | NetworkError, timed out, retryable |
/// | Redirect chain > 10 or loop | NetworkError, not retryable |
/// | Connection refused, DNS, TLS | NetworkError, retryable |
/// | Body read failure | NetworkError, retryable |
pub async fn fetch_url(client: &Client, url: &Url) -> FetchResult {
    let response = match client.get(url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().clone();
    let headers = collect_headers(response.headers());
    let content_type = headers.get("content-type").cloned();

    if !status.is_success() {
        return FetchResult::HttpError {
            final_url,
            status: status.as_u16(),
            headers,
            content_type,
        };
    }

    match response.bytes().await {
        Ok(bytes) => FetchResult::Success {
            final_url,
            status: status.as_u16(),
            headers,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            size: bytes.len() as u64,
        },
        Err(e) => classify_error(&e),
    }
}

/// Fetches a URL, retrying retryable failures
///
/// Waits `backoff`, `2 * backoff`, `4 * backoff`... between attempts.
/// Cancellation during a wait gives up and returns the failed attempt.
/// Returns the last result and the number of attempts made.
pub async fn fetch_with_retry(
    client: &Client,
    url: &Url,
    max_retries: u32,
    backoff: Duration,
    cancel: &CancellationToken,
) -> (FetchResult, u32) {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = fetch_url(client, url).await;

        if attempt > max_retries || !result.is_retryable() {
            return (result, attempt);
        }

        let wait = backoff.saturating_mul(1 << (attempt - 1).min(16));
        tracing::debug!(
            "Retrying {} in {:?} (attempt {}/{}): {}",
            url,
            wait,
            attempt,
            max_retries + 1,
            result.error_message().unwrap_or_default()
        );
        tokio::select! {
            _ = cancel.cancelled() => return (result, attempt),
            _ = tokio::time::sleep(wait) => {}
        }
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            timed_out: true,
            retryable: true,
        }
    } else if e.is_redirect() {
        FetchResult::NetworkError {
            error: format!("Redirect error: {}", e),
            timed_out: false,
            retryable: false,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
            timed_out: false,
            retryable: true,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            timed_out: false,
            retryable: true,
        }
    }
}

/// Flattens response headers; repeated headers are joined with ", "
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}
