use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default user agent sent when a job does not name one
pub const DEFAULT_USER_AGENT: &str = concat!("trawl/", env!("CARGO_PKG_VERSION"));

/// A complete crawl job
///
/// Loaded from a TOML file, validated once, then shared read-only for the
/// whole crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// Name of the workspace directory created for this crawl
    pub project: String,

    /// Seed URLs, crawled first
    #[serde(rename = "start-urls")]
    pub start_urls: Vec<String>,

    /// Follow links found on fetched pages (false = list mode)
    #[serde(rename = "follow-links", default)]
    pub follow_links: bool,

    /// Maximum number of pages to fetch (0 = unlimited)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u64,

    /// Maximum link depth from the seeds (0 = unlimited)
    #[serde(rename = "max-depth", default)]
    pub max_depth: u32,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Rules applied to links discovered while following
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Follow only URLs carrying at least one of these query parameters
    #[serde(rename = "include-url-params", default)]
    pub include_url_params: Vec<String>,

    /// Never follow URLs carrying any of these query parameters
    #[serde(rename = "exclude-url-params", default)]
    pub exclude_url_params: Vec<String>,

    /// Follow only URLs matching at least one of these patterns
    #[serde(rename = "include-url-regex", default)]
    pub include_url_regex: Vec<String>,

    /// Never follow URLs matching any of these patterns
    #[serde(rename = "exclude-url-regex", default)]
    pub exclude_url_regex: Vec<String>,

    /// Domain patterns (e.g. "*.example.com") links must stay within.
    /// Empty means the hosts of the start URLs and their subdomains.
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,
}

/// Fetcher pool behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Number of concurrent fetch workers
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Timeout for a whole request, body included (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Minimum time between two requests to the same host (milliseconds)
    #[serde(rename = "politeness-delay-ms", default)]
    pub politeness_delay_ms: u64,

    /// Retries for transient failures (0 disables retrying)
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Base backoff between retries, doubled on every attempt (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Honor robots.txt rules and Crawl-delay
    #[serde(rename = "obey-robots", default = "default_true")]
    pub obey_robots: bool,
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            request_timeout_ms: default_request_timeout_ms(),
            politeness_delay_ms: 0,
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            obey_robots: true,
        }
    }
}

/// Where crawl workspaces are created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory under which `<project>/` is created
    #[serde(rename = "workspace-root", default = "default_workspace_root")]
    pub workspace_root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
        }
    }
}

impl CrawlJob {
    /// Creates a job with default settings for the given project and seeds
    pub fn new(project: impl Into<String>, start_urls: Vec<String>) -> Self {
        Self {
            project: project.into(),
            start_urls,
            follow_links: false,
            max_pages: 0,
            max_depth: 0,
            user_agent: default_user_agent(),
            filters: FilterConfig::default(),
            fetcher: FetcherConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Path of this job's workspace directory
    pub fn workspace_path(&self) -> PathBuf {
        self.output.workspace_root.join(&self.project)
    }

    /// Returns the budget, or None when unlimited
    pub fn budget(&self) -> Option<u64> {
        (self.max_pages > 0).then_some(self.max_pages)
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_workers() -> u32 {
    8
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}
