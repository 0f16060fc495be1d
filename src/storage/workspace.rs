//! Per-crawl workspace directory
//!
//! ```text
//! <workspace-root>/<project>/
//!     crawl.jl         page records, one JSON object per line
//!     crawl_logs.log   event log
//!     job.toml         the job that produced this crawl
//! ```

use crate::config::{job_fingerprint, CrawlJob};
use crate::storage::traits::{StorageError, StorageResult};
use crate::TrawlError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const RECORDS_FILE: &str = "crawl.jl";
pub const EVENT_LOG_FILE: &str = "crawl_logs.log";
pub const MANIFEST_FILE: &str = "job.toml";

/// Handle to a crawl workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a fresh workspace for a job
    ///
    /// The project directory must not exist. The parent directory is created
    /// if needed, but an existing project directory is never reused, so two
    /// crawls can never interleave records.
    pub fn create(job: &CrawlJob) -> Result<Self, TrawlError> {
        let root = job.workspace_path();

        if let Some(parent) = root.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| TrawlError::WorkspaceCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        match std::fs::create_dir(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(TrawlError::WorkspaceExists { path: root });
            }
            Err(source) => return Err(TrawlError::WorkspaceCreate { path: root, source }),
        }

        let workspace = Self { root };
        workspace.write_manifest(job)?;
        Ok(workspace)
    }

    /// Opens an existing workspace for reading
    pub fn open(path: &Path) -> StorageResult<Self> {
        if !path.is_dir() {
            return Err(StorageError::WorkspaceNotFound(path.to_path_buf()));
        }
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records_path(&self) -> PathBuf {
        self.root.join(RECORDS_FILE)
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.root.join(EVENT_LOG_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn write_manifest(&self, job: &CrawlJob) -> Result<(), TrawlError> {
        let body = toml::to_string_pretty(job).map_err(crate::ConfigError::from)?;
        let fingerprint = job_fingerprint(job)?;
        let content = format!("# fingerprint: {}\n{}", fingerprint, body);
        std::fs::write(self.manifest_path(), content)?;
        Ok(())
    }
}
