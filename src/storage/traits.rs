//! Storage traits and error types
//!
//! This module defines the trait interface for record sinks and the
//! associated error types.

use crate::storage::PageRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Workspace not found: {}", .0.display())]
    WorkspaceNotFound(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record at line {line}: {message}")]
    CorruptRecord { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for page records
///
/// Implementations must make each append all-or-nothing: a reader may see a
/// record or not see it, never a fragment of it. Appends never rewrite
/// earlier records.
pub trait RecordSink: Send {
    /// Durably appends one record
    fn append(&mut self, record: &PageRecord) -> StorageResult<()>;

    /// Number of records appended through this sink
    fn appended(&self) -> u64;
}
