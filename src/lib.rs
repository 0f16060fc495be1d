//! Trawl: a polite, budgeted web crawl engine
//!
//! This crate crawls a set of seed URLs (optionally following links), filters
//! discovered URLs by parameter and regex rules, and appends one structured
//! record per fetched page to an append-only log in a per-crawl workspace.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace already exists: {}", path.display())]
    WorkspaceExists { path: PathBuf },

    #[error("Failed to create workspace {}: {source}", path.display())]
    WorkspaceCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlStatus,
        to: state::CrawlStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrawlError {
    /// Returns true for errors raised before any page was fetched
    ///
    /// Setup errors leave the workspace untouched (or never create it) and the
    /// crawl never reaches the `Running` status.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::WorkspaceExists { .. }
                | Self::WorkspaceCreate { .. }
                | Self::Reqwest(_)
        )
    }
}

/// Job configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read job file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize job: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in job: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::CrawlJob;
pub use crawler::{Controller, CrawlReport};
pub use state::{CrawlSnapshot, CrawlStatus};
pub use storage::PageRecord;
pub use url::{normalize_url, passes_filters, resolve_url, UrlFilter};
