//! Per-crawl robots.txt cache
//!
//! Each host's robots.txt is fetched at most once per crawl. Concurrent
//! workers asking for the same host wait on the same fetch.

use crate::robots::ParsedRobots;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<ParsedRobots>>>;

#[derive(Debug, Default)]
pub struct RobotsCache {
    hosts: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rules for `host`, running `fetch` on first use
    pub async fn get_or_fetch<F, Fut>(&self, host: &str, fetch: F) -> Arc<ParsedRobots>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ParsedRobots>,
    {
        let slot = {
            let mut hosts = self.hosts.lock().unwrap_or_else(|p| p.into_inner());
            Arc::clone(hosts.entry(host.to_string()).or_default())
        };

        let robots = slot.get_or_init(|| async { Arc::new(fetch().await) }).await;
        Arc::clone(robots)
    }

    /// Number of hosts with a cache slot
    pub fn len(&self) -> usize {
        self.hosts.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
