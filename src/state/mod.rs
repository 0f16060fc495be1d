//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStatus`: lifecycle of a crawl (initializing, running, and the
//!   terminal completed / budget_exhausted / aborted)
//! - `CrawlState`: status plus counters, owned by the controller
//! - `CrawlSnapshot`: read-only copy handed to clients

mod crawl_state;

// Re-export main types
pub use crawl_state::{CrawlSnapshot, CrawlState, CrawlStatus};
