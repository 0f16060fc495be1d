//! Exporter traits and types
//!
//! This module defines the trait interface for record exporters and the
//! associated error types.

use crate::storage::{PageRecord, StorageError};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Export target already exists: {}", .0.display())]
    TargetExists(std::path::PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes a full set of records to a file in one format
pub trait Exporter {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Writes `records` to `path`, replacing nothing that already exists
    fn export(&self, records: &[PageRecord], path: &Path) -> OutputResult<()>;
}

/// Export formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Sqlite,
    Markdown,
}

impl ExportFormat {
    /// Picks the format from a path's extension
    ///
    /// `.csv`, `.db`/`.sqlite`/`.sqlite3` and `.md` are recognized.
    pub fn from_path(path: &Path) -> OutputResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "db" | "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(OutputError::UnsupportedFormat(path.display().to_string())),
        }
    }
}
