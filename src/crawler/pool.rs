//! Fetcher pool
//!
//! A fixed number of tokio tasks share one [`Frontier`]. Each worker takes an
//! entry, fetches it politely, turns the outcome into a [`PageRecord`],
//! feeds newly discovered links back into the frontier, and hands the record
//! to the controller over an mpsc channel. Only the controller writes records.

use crate::config::CrawlJob;
use crate::crawler::fetcher::{fetch_with_retry, FetchResult};
use crate::crawler::frontier::{Dequeue, EnqueueOutcome, Frontier, FrontierEntry};
use crate::crawler::parser::parse_result;
use crate::crawler::politeness::Politeness;
use crate::robots::{fetch_robots, ParsedRobots, RobotsCache};
use crate::storage::PageRecord;
use crate::url::{host_key, normalize_url, robots_url, UrlFilter};
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Error recorded for pages robots.txt forbids
pub const DISALLOWED_BY_ROBOTS: &str = "disallowed by robots.txt";

/// Everything a worker needs, shared across the pool
#[derive(Clone)]
pub struct WorkerContext {
    pub job: Arc<CrawlJob>,
    pub client: Client,
    pub frontier: Arc<Frontier>,
    pub filter: Arc<UrlFilter>,
    pub politeness: Arc<Politeness>,
    pub robots: Arc<RobotsCache>,
    pub cancel: CancellationToken,
    pub records: mpsc::Sender<PageRecord>,
}

/// Per-worker counters, returned when the worker exits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub pages: u64,
    pub links_queued: u64,
}

/// Handle to the running workers
pub struct FetcherPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl FetcherPool {
    /// Starts `workers` tasks pulling from the shared frontier
    pub fn spawn(ctx: WorkerContext, workers: usize) -> Self {
        let handles = (0..workers.max(1))
            .map(|id| tokio::spawn(run_worker(id, ctx.clone())))
            .collect();
        Self { handles }
    }

    /// Waits for every worker to exit and sums their counters
    pub async fn join(self) -> WorkerStats {
        let mut total = WorkerStats::default();
        for handle in self.handles {
            match handle.await {
                Ok(stats) => {
                    total.pages += stats.pages;
                    total.links_queued += stats.links_queued;
                }
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }
        total
    }
}

/// Reports an entry done to the frontier when dropped
///
/// Dropping also happens while a panicking worker unwinds, so the frontier
/// never waits on an entry nobody is processing.
struct InFlight<'a> {
    frontier: &'a Frontier,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.frontier.task_done();
    }
}

async fn run_worker(id: usize, ctx: WorkerContext) -> WorkerStats {
    tracing::debug!("Worker {} started", id);
    let mut stats = WorkerStats::default();

    loop {
        let entry = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            next = ctx.frontier.dequeue() => match next {
                Dequeue::Entry(entry) => entry,
                Dequeue::Empty => continue,
                Dequeue::Finished => break,
            },
        };
        let _in_flight = InFlight {
            frontier: &ctx.frontier,
        };

        let Some((record, queued)) = process_entry(&ctx, &entry).await else {
            tracing::debug!("Worker {}: cancelled before fetching {}", id, entry.url);
            break;
        };
        stats.pages += 1;
        stats.links_queued += queued;

        if ctx.records.send(record).await.is_err() {
            tracing::debug!("Worker {}: record channel closed", id);
            break;
        }
    }

    tracing::debug!("Worker {} finished after {} pages", id, stats.pages);
    stats
}

/// Fetches one entry and returns its record and the number of links queued
///
/// Returns None when the crawl is cancelled while waiting for the host's
/// politeness slot; nothing was fetched and no record is produced.
async fn process_entry(ctx: &WorkerContext, entry: &FrontierEntry) -> Option<(PageRecord, u64)> {
    let started = Instant::now();
    let job = &ctx.job;
    let mut record = PageRecord::new(
        entry.url.as_str(),
        entry.depth,
        entry.referrer.as_ref().map(|r| r.to_string()),
    );
    let host = host_key(&entry.url).unwrap_or_default();

    let robots = if job.fetcher.obey_robots {
        Some(robots_for(ctx, &entry.url, &host).await)
    } else {
        None
    };

    if let Some(robots) = &robots {
        if !robots.is_allowed(entry.url.as_str(), &job.user_agent) {
            tracing::debug!("Disallowed by robots.txt: {}", entry.url);
            record.crawl_time = Utc::now();
            record.elapsed_ms = elapsed_ms(started);
            return Some((record.with_error(DISALLOWED_BY_ROBOTS), 0));
        }
    }

    let crawl_delay = robots.as_ref().and_then(|r| r.crawl_delay(&job.user_agent));
    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return None,
        _ = ctx.politeness.wait_turn(&host, crawl_delay) => {}
    }

    let (result, attempts) = fetch_with_retry(
        &ctx.client,
        &entry.url,
        job.fetcher.max_retries,
        Duration::from_millis(job.fetcher.retry_backoff_ms),
        &ctx.cancel,
    )
    .await;

    if let Some(error) = result.error_message() {
        tracing::warn!("Fetch failed for {} after {} attempt(s): {}", entry.url, attempts, error);
    }

    fill_record(&mut record, &result);
    record.crawl_time = Utc::now();
    record.elapsed_ms = elapsed_ms(started);

    // The redirect target counts as visited but not against the budget
    if let Some(final_url) = result.final_url() {
        if let Ok(final_url) = normalize_url(final_url.as_str()) {
            if final_url != entry.url {
                ctx.frontier.mark_visited(&final_url);
            }
        }
    }

    let queued = if should_follow(job, entry.depth) {
        enqueue_links(ctx, entry, &record.links)
    } else {
        0
    };

    Some((record, queued))
}

/// Copies the fetch outcome and page summary into the record
fn fill_record(record: &mut PageRecord, result: &FetchResult) {
    match result {
        FetchResult::Success {
            final_url,
            status,
            headers,
            content_type,
            size,
            ..
        } => {
            record.final_url = Some(final_url.to_string());
            record.status = Some(*status);
            record.headers = headers.clone();
            record.content_type = content_type.clone();
            record.size = *size;

            if let Some(parsed) = parse_result(result) {
                record.title = parsed.title;
                record.meta_description = parsed.meta_description;
                record.h1 = parsed.h1;
                record.canonical = parsed.canonical;
                record.links = parsed.links;
            }
        }
        FetchResult::HttpError {
            final_url,
            status,
            headers,
            content_type,
        } => {
            record.final_url = Some(final_url.to_string());
            record.status = Some(*status);
            record.headers = headers.clone();
            record.content_type = content_type.clone();
        }
        FetchResult::NetworkError { .. } => {}
    }
    record.error = result.error_message();
}

fn should_follow(job: &CrawlJob, depth: u32) -> bool {
    job.follow_links && (job.max_depth == 0 || depth < job.max_depth)
}

fn enqueue_links(ctx: &WorkerContext, entry: &FrontierEntry, links: &[String]) -> u64 {
    let mut queued = 0;
    for link in links {
        let url = match normalize_url(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping link {}: {}", link, e);
                continue;
            }
        };

        if !ctx.filter.passes(&url) {
            tracing::trace!("Filtered out {}", url);
            continue;
        }

        let candidate = FrontierEntry::discovered(url, entry.depth + 1, entry.url.clone());
        match ctx.frontier.enqueue(candidate) {
            EnqueueOutcome::Queued => queued += 1,
            EnqueueOutcome::AlreadySeen => {}
            EnqueueOutcome::BudgetReached => {
                tracing::trace!("Budget reached, not queueing {}", link);
            }
            EnqueueOutcome::Closed => break,
        }
    }
    queued
}

async fn robots_for(ctx: &WorkerContext, url: &url::Url, host: &str) -> Arc<ParsedRobots> {
    let Some(robots_url) = robots_url(url) else {
        return Arc::new(ParsedRobots::allow_all());
    };
    let client = ctx.client.clone();
    ctx.robots
        .get_or_fetch(host, || async move {
            tracing::debug!("Fetching {}", robots_url);
            fetch_robots(&client, &robots_url).await
        })
        .await
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use url::Url;

    #[test]
    fn test_should_follow() {
        let mut job = CrawlJob::new("example", vec!["http://a.test/".to_string()]);
        assert!(!should_follow(&job, 0));

        job.follow_links = true;
        assert!(should_follow(&job, 100));

        job.max_depth = 2;
        assert!(should_follow(&job, 1));
        assert!(!should_follow(&job, 2));
    }

    #[test]
    fn test_fill_record_http_error() {
        let mut record = PageRecord::new("http://a.test/x", 0, None);
        let result = FetchResult::HttpError {
            final_url: Url::parse("http://a.test/x").unwrap(),
            status: 404,
            headers: BTreeMap::new(),
            content_type: None,
        };
        fill_record(&mut record, &result);
        assert_eq!(record.status, Some(404));
        assert_eq!(record.error.as_deref(), Some("HTTP 404 Not Found"));
        assert!(record.links.is_empty());
    }

    #[test]
    fn test_fill_record_success_html() {
        let mut record = PageRecord::new("http://a.test/", 0, None);
        let body = r#"<title>Home</title><a href="/about">About</a>"#;
        let result = FetchResult::Success {
            final_url: Url::parse("http://a.test/").unwrap(),
            status: 200,
            headers: BTreeMap::new(),
            content_type: Some("text/html".to_string()),
            body: body.to_string(),
            size: body.len() as u64,
        };
        fill_record(&mut record, &result);
        assert!(record.is_success());
        assert_eq!(record.title.as_deref(), Some("Home"));
        assert_eq!(record.links, vec!["http://a.test/about"]);
        assert_eq!(record.size, body.len() as u64);
    }

    #[test]
    fn test_fill_record_network_error() {
        let mut record = PageRecord::new("http://a.test/", 0, None);
        let result = FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            timed_out: true,
            retryable: true,
        };
        fill_record(&mut record, &result);
        assert_eq!(record.status, None);
        assert_eq!(record.error.as_deref(), Some("Request timeout"));
    }
}
