//! Per-host request spacing
//!
//! Workers reserve the next free slot for a host before fetching from it.
//! Reservation happens under a lock and waiting happens outside it, so two
//! workers can never claim the same slot and no worker blocks another host.

use crate::robots::MAX_CRAWL_DELAY;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct HostSlot {
    /// Earliest time the next request may start
    next_request: Instant,
    /// Number of requests sent so far
    request_count: u32,
}

/// Spaces requests to the same host by a minimum delay
#[derive(Debug)]
pub struct Politeness {
    default_delay: Duration,
    hosts: Mutex<HashMap<String, HostSlot>>,
}

impl Politeness {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the delay to apply to a host
    ///
    /// The larger of the configured delay and the host's robots.txt
    /// `Crawl-delay`, the latter clamped to [`MAX_CRAWL_DELAY`].
    pub fn effective_delay(&self, crawl_delay: Option<Duration>) -> Duration {
        let crawl_delay = crawl_delay.unwrap_or(Duration::ZERO).min(MAX_CRAWL_DELAY);
        std::cmp::max(self.default_delay, crawl_delay)
    }

    /// Claims the next request slot for `host` and returns when it starts
    pub fn reserve(&self, host: &str, delay: Duration) -> Instant {
        let now = Instant::now();
        let mut hosts = self.hosts.lock().unwrap_or_else(|p| p.into_inner());

        let slot = hosts.entry(host.to_string()).or_insert(HostSlot {
            next_request: now,
            request_count: 0,
        });

        let start = std::cmp::max(slot.next_request, now);
        slot.next_request = start + delay;
        slot.request_count += 1;
        start
    }

    /// Reserves a slot for `host` and sleeps until it starts
    pub async fn wait_turn(&self, host: &str, crawl_delay: Option<Duration>) {
        let delay = self.effective_delay(crawl_delay);
        let start = self.reserve(host, delay);

        if start > Instant::now() {
            tracing::trace!("Waiting {:?} for {}", start - Instant::now(), host);
            tokio::time::sleep_until(start).await;
        }
    }

    /// Number of requests reserved for `host` so far
    pub fn request_count(&self, host: &str) -> u32 {
        let hosts = self.hosts.lock().unwrap_or_else(|p| p.into_inner());
        hosts.get(host).map(|slot| slot.request_count).unwrap_or(0)
    }
}
