//! Statistics computed from a crawl's record log
//!
//! This module provides functionality for summarizing page records and
//! displaying the result.

use crate::storage::PageRecord;
use std::collections::{BTreeMap, BTreeSet};

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Total number of records
    pub total_pages: u64,

    /// Records without an error
    pub succeeded: u64,

    /// Records with an error
    pub failed: u64,

    /// Number of distinct hosts fetched
    pub unique_hosts: u64,

    /// Total links found across all pages
    pub total_links: u64,

    /// Total body bytes received
    pub total_bytes: u64,

    /// Mean fetch time in milliseconds
    pub avg_elapsed_ms: f64,

    /// Count of records per HTTP status
    pub status_counts: BTreeMap<u16, u64>,

    /// Count of records per error message
    pub error_summary: BTreeMap<String, u64>,

    /// Count of records per crawl depth
    pub depth_breakdown: BTreeMap<u32, u64>,
}

impl CrawlStatistics {
    /// Percentage of records fetched without error
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total_pages as f64) * 100.0
        }
    }
}

/// Computes statistics over a set of records
pub fn load_statistics(records: &[PageRecord]) -> CrawlStatistics {
    let mut stats = CrawlStatistics::default();
    let mut hosts = BTreeSet::new();
    let mut elapsed_total = 0u64;

    for record in records {
        stats.total_pages += 1;
        match &record.error {
            None => stats.succeeded += 1,
            Some(error) => {
                stats.failed += 1;
                *stats.error_summary.entry(error.clone()).or_insert(0) += 1;
            }
        }

        if let Some(status) = record.status {
            *stats.status_counts.entry(status).or_insert(0) += 1;
        }
        *stats.depth_breakdown.entry(record.depth).or_insert(0) += 1;

        if let Some(host) = url::Url::parse(&record.url)
            .ok()
            .and_then(|u| crate::url::host_key(&u))
        {
            hosts.insert(host);
        }

        stats.total_links += record.links.len() as u64;
        stats.total_bytes += record.size;
        elapsed_total += record.elapsed_ms;
    }

    stats.unique_hosts = hosts.len() as u64;
    if stats.total_pages > 0 {
        stats.avg_elapsed_ms = elapsed_total as f64 / stats.total_pages as f64;
    }
    stats
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Unique hosts: {}", stats.unique_hosts);
    println!("  Total links found: {}", stats.total_links);
    println!("  Bytes received: {}", stats.total_bytes);
    println!("  Average fetch time: {:.0} ms", stats.avg_elapsed_ms);
    println!();

    if !stats.status_counts.is_empty() {
        println!("Pages by Status:");
        for (status, count) in &stats.status_counts {
            println!("  {}: {}", status, count);
        }
        println!();
    }

    if !stats.depth_breakdown.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &stats.depth_breakdown {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut errors: Vec<_> = stats.error_summary.iter().collect();
        errors.sort_by(|a, b| b.1.cmp(a.1));
        for (error, count) in errors {
            println!("  {}: {}", error, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched without error)",
        stats.success_rate(),
        stats.succeeded,
        stats.total_pages
    );
}
