use crate::config::types::CrawlJob;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a crawl job from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML job file
///
/// # Returns
///
/// * `Ok(CrawlJob)` - Successfully loaded and validated job
/// * `Err(ConfigError)` - Failed to load, parse, or validate the job
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use trawl::config::load_job;
///
/// let job = load_job(Path::new("job.toml")).unwrap();
/// println!("Budget: {}", job.max_pages);
/// ```
pub fn load_job(path: &Path) -> Result<CrawlJob, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_job(&content)
}

/// Parses and validates a crawl job from TOML text
pub fn parse_job(content: &str) -> Result<CrawlJob, ConfigError> {
    let job: CrawlJob = toml::from_str(content)?;
    validate(&job)?;
    Ok(job)
}

/// Computes a SHA-256 hash of the job file content
///
/// Stored in the workspace manifest so a crawl's data can be traced back to
/// the exact job that produced it.
pub fn compute_job_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_str(&content))
}

/// Loads a job and returns both the job and its hash
pub fn load_job_with_hash(path: &Path) -> Result<(CrawlJob, String), ConfigError> {
    let job = load_job(path)?;
    let hash = compute_job_hash(path)?;
    Ok((job, hash))
}

/// Hashes the canonical TOML serialization of an in-memory job
pub fn job_fingerprint(job: &CrawlJob) -> Result<String, ConfigError> {
    let content = toml::to_string(job)?;
    Ok(hash_str(&content))
}

fn hash_str(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
