//! Storage module for persisting crawl output
//!
//! This module handles everything a crawl writes to disk:
//! - The per-crawl workspace directory and its job manifest
//! - The append-only JSON Lines record log (`crawl.jl`)
//! - The human-readable event log (`crawl_logs.log`)

mod events;
mod record;
mod sink;
mod traits;
mod workspace;

pub use events::EventLog;
pub use record::PageRecord;
pub use sink::{read_records, JsonlSink};
pub use traits::{RecordSink, StorageError, StorageResult};
pub use workspace::{Workspace, EVENT_LOG_FILE, MANIFEST_FILE, RECORDS_FILE};

use std::path::Path;

/// Loads all records from a workspace directory
pub fn load_workspace_records(workspace: &Path) -> StorageResult<Vec<PageRecord>> {
    let workspace = Workspace::open(workspace)?;
    read_records(&workspace.records_path())
}
