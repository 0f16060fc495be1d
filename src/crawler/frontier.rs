//! Crawl frontier
//!
//! This module handles:
//! - FIFO queue of URLs waiting to be fetched
//! - The visited set, so a URL is admitted at most once per crawl
//! - The page budget, enforced at admission time
//! - Detecting the end of a crawl (queue drained with nothing in flight)
//!
//! Workers share one `Frontier` behind an `Arc`. Every entry handed out by
//! [`Frontier::dequeue`] must be matched by one [`Frontier::task_done`] call
//! once its links are enqueued and its record has been handed off.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

/// How long an idle worker waits for new work before polling again
const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(250);

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,

    /// Link hops from the nearest seed
    pub depth: u32,

    /// Page this URL was discovered on (`None` for seeds)
    pub referrer: Option<Url>,
}

impl FrontierEntry {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            referrer: None,
        }
    }

    pub fn discovered(url: Url, depth: u32, referrer: Url) -> Self {
        Self {
            url,
            depth,
            referrer: Some(referrer),
        }
    }
}

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Admitted and waiting to be fetched
    Queued,

    /// Already admitted or fetched earlier in this crawl
    AlreadySeen,

    /// The page budget is used up
    BudgetReached,

    /// The crawl is finalized
    Closed,
}

/// Result of asking the frontier for work
#[derive(Debug)]
pub enum Dequeue {
    /// Next URL to fetch
    Entry(FrontierEntry),

    /// Nothing queued yet, but other workers may still discover links
    Empty,

    /// The crawl is over; the worker should exit
    Finished,
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    admitted: u64,
    in_flight: usize,
    closed: bool,
    budget_rejections: u64,
}

/// Concurrency-safe, deduplicating, budgeted URL queue
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<Inner>,
    notify: Notify,
    max_pages: Option<u64>,
    idle_wait: Duration,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// `max_pages` of `None` means no budget.
    pub fn new(max_pages: Option<u64>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            max_pages,
            idle_wait: DEFAULT_IDLE_WAIT,
        }
    }

    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Offers a URL to the frontier
    ///
    /// The visited check comes before the budget check, so re-discovering a
    /// known URL never counts as a budget rejection.
    pub fn enqueue(&self, entry: FrontierEntry) -> EnqueueOutcome {
        let mut inner = self.lock();

        if inner.closed {
            return EnqueueOutcome::Closed;
        }

        if inner.visited.contains(entry.url.as_str()) {
            return EnqueueOutcome::AlreadySeen;
        }

        if let Some(max) = self.max_pages {
            if inner.admitted >= max {
                inner.budget_rejections += 1;
                return EnqueueOutcome::BudgetReached;
            }
        }

        inner.visited.insert(entry.url.as_str().to_string());
        inner.admitted += 1;
        inner.queue.push_back(entry);
        drop(inner);

        self.notify.notify_one();
        EnqueueOutcome::Queued
    }

    /// Takes the next URL to fetch
    ///
    /// Returns `Empty` after a bounded wait when the queue is empty but other
    /// entries are still in flight, so callers can re-check cancellation.
    pub async fn dequeue(&self) -> Dequeue {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        {
            let mut inner = self.lock();

            if inner.closed {
                return Dequeue::Finished;
            }

            if let Some(entry) = inner.queue.pop_front() {
                inner.in_flight += 1;
                return Dequeue::Entry(entry);
            }

            if inner.in_flight == 0 {
                inner.closed = true;
                drop(inner);
                self.notify.notify_waiters();
                return Dequeue::Finished;
            }
        }

        let _ = tokio::time::timeout(self.idle_wait, notified).await;
        Dequeue::Empty
    }

    /// Reports that a dequeued entry has been fully processed
    pub fn task_done(&self) {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);

        if inner.queue.is_empty() && inner.in_flight == 0 && !inner.closed {
            tracing::debug!("Frontier drained, finalizing");
            inner.closed = true;
            drop(inner);
            self.notify.notify_waiters();
        }
    }

    /// Records a URL as seen without admitting it
    ///
    /// Returns true if the URL was not already known.
    pub fn mark_visited(&self, url: &Url) -> bool {
        self.lock().visited.insert(url.as_str().to_string())
    }

    /// Finalizes the frontier immediately
    ///
    /// Queued entries are dropped from further consideration; entries already
    /// in flight still finish.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        drop(inner);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of entries dequeued but not yet reported done
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Entries queued plus entries in flight
    pub fn remaining(&self) -> u64 {
        let inner = self.lock();
        (inner.queue.len() + inner.in_flight) as u64
    }

    /// Number of entries admitted so far
    pub fn admitted(&self) -> u64 {
        self.lock().admitted
    }

    /// Number of enqueues refused because the budget was used up
    pub fn budget_rejections(&self) -> u64 {
        self.lock().budget_rejections
    }
}
