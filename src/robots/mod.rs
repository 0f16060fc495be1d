//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files for the duration of one crawl.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::{product_token, ParsedRobots, MAX_CRAWL_DELAY};

use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the host serving `robots_url`
///
/// Never fails: a missing, unreachable, or non-2xx robots.txt means
/// everything is allowed.
pub async fn fetch_robots(client: &Client, robots_url: &Url) -> ParsedRobots {
    let response = match client.get(robots_url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("robots.txt unreachable at {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt at {} returned {}, allowing all",
            robots_url,
            response.status()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::debug!("Failed to read robots.txt at {}: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
