//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating, budgeted frontier
//! - HTTP fetching with optional retry
//! - Per-host politeness
//! - HTML parsing and link extraction
//! - The worker pool and the crawl controller

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod politeness;
mod pool;

pub use coordinator::{Controller, CrawlReport};
pub use fetcher::{build_http_client, fetch_url, fetch_with_retry, FetchResult, MAX_REDIRECTS};
pub use frontier::{Dequeue, EnqueueOutcome, Frontier, FrontierEntry};
pub use parser::{extract, is_html, parse_html, parse_result, ParsedPage};
pub use politeness::Politeness;
pub use pool::{FetcherPool, WorkerContext, WorkerStats, DISALLOWED_BY_ROBOTS};

use crate::config::CrawlJob;
use crate::TrawlError;

/// Runs a complete crawl for a job
///
/// Convenience wrapper for callers that need neither progress snapshots nor
/// cancellation. It will:
/// 1. Validate the job and create its workspace
/// 2. Seed the frontier
/// 3. Fetch pages with the worker pool, following links if enabled
/// 4. Append one record per page to the workspace's record log
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use trawl::config::load_job;
/// use trawl::crawler::crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let job = load_job(Path::new("job.toml"))?;
/// let report = crawl(job).await?;
/// println!("{}: {} pages", report.status, report.pages_fetched);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(job: CrawlJob) -> Result<CrawlReport, TrawlError> {
    Controller::new(job).run().await
}
