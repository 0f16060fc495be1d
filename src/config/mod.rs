//! Job configuration module for Trawl
//!
//! This module handles loading, parsing, and validating TOML crawl jobs.
//!
//! # Example
//!
//! ```no_run
//! use trawl::config::load_job;
//! use std::path::Path;
//!
//! let job = load_job(Path::new("job.toml")).unwrap();
//! println!("Crawling {} seed URLs", job.start_urls.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CrawlJob, FetcherConfig, FilterConfig, OutputConfig, DEFAULT_USER_AGENT};

// Re-export parser functions
pub use parser::{compute_job_hash, job_fingerprint, load_job, load_job_with_hash, parse_job};
pub use validation::validate;
