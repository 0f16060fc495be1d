//! Crawl controller - main crawl orchestration logic
//!
//! This module contains the crawl lifecycle, including:
//! - Validating the job and preparing the workspace
//! - Seeding the frontier and spawning the fetcher pool
//! - Writing every page record through the single record sink
//! - Publishing progress snapshots and handling cancellation
//! - Deciding the final status

use crate::config::{validate, CrawlJob};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::{EnqueueOutcome, Frontier, FrontierEntry};
use crate::crawler::politeness::Politeness;
use crate::crawler::pool::{FetcherPool, WorkerContext};
use crate::robots::RobotsCache;
use crate::state::{CrawlSnapshot, CrawlState, CrawlStatus};
use crate::storage::{EventLog, JsonlSink, PageRecord, RecordSink, StorageResult, Workspace};
use crate::url::{normalize_url, UrlFilter};
use crate::{ConfigError, TrawlError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Summary of a finished crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub project: String,
    pub workspace: PathBuf,
    pub status: CrawlStatus,
    pub pages_fetched: u64,
    pub pages_failed: u64,
    /// Entries left unfetched (non-zero only for aborted crawls)
    pub pages_remaining: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Everything built during initialization
struct Prepared {
    seeds: Vec<Url>,
    filter: UrlFilter,
    client: Client,
    workspace: Workspace,
    events: EventLog,
    sink: Box<dyn RecordSink>,
}

/// Orchestrates one crawl from job to final status
///
/// A controller runs exactly once. Subscribe and grab the cancellation token
/// before calling [`Controller::run`].
pub struct Controller {
    job: Arc<CrawlJob>,
    state: CrawlState,
    snapshots: watch::Sender<CrawlSnapshot>,
    cancel: CancellationToken,
}

impl Controller {
    pub fn new(job: CrawlJob) -> Self {
        let state = CrawlState::new();
        let (snapshots, _) = watch::channel(state.snapshot());
        Self {
            job: Arc::new(job),
            state,
            snapshots,
            cancel: CancellationToken::new(),
        }
    }

    pub fn job(&self) -> &CrawlJob {
        &self.job
    }

    /// Returns a receiver that always holds the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<CrawlSnapshot> {
        self.snapshots.subscribe()
    }

    /// Returns the token that cancels this crawl
    ///
    /// Cancelling stops new fetches; fetches already running finish and
    /// their records are written.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl to a terminal status
    ///
    /// Setup failures (invalid job, existing workspace, HTTP client) and
    /// record-log failures are returned as errors with the status `Aborted`.
    /// Cancellation and budget exhaustion are not errors.
    pub async fn run(self) -> Result<CrawlReport, TrawlError> {
        self.run_with(|workspace| {
            let sink = JsonlSink::open(&workspace.records_path())?;
            Ok(Box::new(sink) as Box<dyn RecordSink>)
        })
        .await
    }

    pub(crate) async fn run_with<F>(mut self, open_sink: F) -> Result<CrawlReport, TrawlError>
    where
        F: FnOnce(&Workspace) -> StorageResult<Box<dyn RecordSink>>,
    {
        let started_at = Utc::now();

        let prepared = match self.prepare(open_sink) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!("Crawl setup failed: {}", e);
                self.transition(CrawlStatus::Aborted)?;
                return Err(e);
            }
        };

        self.crawl(prepared, started_at).await
    }

    /// Validates the job and creates everything the crawl needs
    ///
    /// Nothing touches the filesystem until the job, seeds, filters and
    /// client are known to be good.
    fn prepare<F>(&self, open_sink: F) -> Result<Prepared, TrawlError>
    where
        F: FnOnce(&Workspace) -> StorageResult<Box<dyn RecordSink>>,
    {
        let job = &self.job;
        validate(job)?;

        let seeds = normalize_seeds(&job.start_urls);
        if seeds.is_empty() {
            return Err(ConfigError::InvalidUrl("no valid start URLs".to_string()).into());
        }

        let filter = UrlFilter::new(&job.filters, &seeds)?;
        let client = build_http_client(&job.user_agent, job.fetcher.request_timeout())?;

        let workspace = Workspace::create(job)?;
        tracing::info!("Created workspace {}", workspace.root().display());

        let events = EventLog::open(&workspace.event_log_path())?;
        let sink = open_sink(&workspace)?;

        Ok(Prepared {
            seeds,
            filter,
            client,
            workspace,
            events,
            sink,
        })
    }

    async fn crawl(
        mut self,
        prepared: Prepared,
        started_at: DateTime<Utc>,
    ) -> Result<CrawlReport, TrawlError> {
        let Prepared {
            seeds,
            filter,
            client,
            workspace,
            events,
            mut sink,
        } = prepared;
        let job = Arc::clone(&self.job);

        let frontier = Arc::new(Frontier::new(job.budget()));
        for seed in seeds {
            if frontier.enqueue(FrontierEntry::seed(seed.clone())) == EnqueueOutcome::BudgetReached {
                tracing::debug!("Budget reached, seed {} not queued", seed);
            }
        }

        events.info(format!(
            "Crawl started: project {}, {} seed(s), budget {}",
            job.project,
            frontier.len(),
            job.budget()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "unlimited".to_string())
        ));
        tracing::info!(
            "Starting crawl {} with {} seed(s) and {} worker(s)",
            job.project,
            frontier.len(),
            job.fetcher.workers
        );

        self.transition(CrawlStatus::Running)?;
        self.publish(&frontier);

        let workers = job.fetcher.workers as usize;
        let (tx, mut rx) = mpsc::channel::<PageRecord>(workers * 2);
        let ctx = WorkerContext {
            job: Arc::clone(&job),
            client,
            frontier: Arc::clone(&frontier),
            filter: Arc::new(filter),
            politeness: Arc::new(Politeness::new(job.fetcher.politeness_delay())),
            robots: Arc::new(RobotsCache::new()),
            cancel: self.cancel.clone(),
            records: tx,
        };
        let pool = FetcherPool::spawn(ctx, workers);

        let cancel = self.cancel.clone();
        let start_time = std::time::Instant::now();
        let mut fatal: Option<TrawlError> = None;
        let mut cancel_seen = false;

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(record) = received else {
                        break;
                    };
                    if fatal.is_some() {
                        tracing::debug!("Discarding record for {} after storage failure", record.url);
                        continue;
                    }
                    if let Err(e) = sink.append(&record) {
                        tracing::error!("Failed to write record for {}: {}", record.url, e);
                        events.error(format!("Storage failure, aborting: {}", e));
                        fatal = Some(e.into());
                        cancel.cancel();
                        frontier.close();
                        continue;
                    }
                    self.log_record(&events, &record);
                    self.state.record_page(!record.is_success());
                    self.publish(&frontier);

                    let fetched = self.state.pages_fetched();
                    if fetched % 10 == 0 {
                        let rate = fetched as f64 / start_time.elapsed().as_secs_f64().max(0.001);
                        tracing::info!(
                            "Progress: {} pages fetched, {} remaining, {:.2} pages/sec",
                            fetched,
                            frontier.remaining(),
                            rate
                        );
                    }
                }
                _ = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    if fatal.is_none() {
                        tracing::info!("Crawl cancelled, waiting for in-flight fetches");
                        events.warn("Crawl cancelled");
                    }
                    frontier.close();
                }
            }
        }

        let stats = pool.join().await;
        tracing::debug!("Workers queued {} links in total", stats.links_queued);

        let status = if fatal.is_some() || cancel.is_cancelled() {
            CrawlStatus::Aborted
        } else if job
            .budget()
            .is_some_and(|max| self.state.pages_fetched() >= max && frontier.budget_rejections() > 0)
        {
            CrawlStatus::BudgetExhausted
        } else {
            CrawlStatus::Completed
        };

        self.state.set_remaining(frontier.len() as u64);
        self.transition(status)?;

        let report = CrawlReport {
            project: job.project.clone(),
            workspace: workspace.root().to_path_buf(),
            status,
            pages_fetched: self.state.pages_fetched(),
            pages_failed: self.state.pages_failed(),
            pages_remaining: frontier.len() as u64,
            started_at,
            finished_at: Utc::now(),
        };

        events.info(format!(
            "Crawl finished: {} ({} fetched, {} failed) in {}s",
            status,
            report.pages_fetched,
            report.pages_failed,
            report.duration().num_seconds()
        ));
        tracing::info!(
            "Crawl {} finished with status {}: {} pages fetched, {} failed in {:?}",
            job.project,
            status,
            report.pages_fetched,
            report.pages_failed,
            start_time.elapsed()
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    fn transition(&mut self, to: CrawlStatus) -> Result<(), TrawlError> {
        self.state.transition(to)?;
        self.snapshots.send_replace(self.state.snapshot());
        Ok(())
    }

    fn publish(&mut self, frontier: &Frontier) {
        self.state.set_remaining(frontier.remaining());
        self.snapshots.send_replace(self.state.snapshot());
    }

    fn log_record(&self, events: &EventLog, record: &PageRecord) {
        match (&record.error, record.status) {
            (None, Some(status)) => events.info(format!("Crawled ({}) {}", status, record.url)),
            (None, None) => events.info(format!("Crawled {}", record.url)),
            (Some(error), _) => events.warn(format!("Failed {}: {}", record.url, error)),
        }
    }
}

/// Normalizes seed URLs, dropping invalid ones and duplicates
///
/// Order is preserved; the first occurrence of each URL wins.
fn normalize_seeds(start_urls: &[String]) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for raw in start_urls {
        match normalize_url(raw) {
            Ok(url) => {
                if seen.insert(url.as_str().to_string()) {
                    seeds.push(url);
                }
            }
            Err(e) => tracing::warn!("Skipping invalid start URL {:?}: {}", raw, e),
        }
    }

    seeds
}
