//! JSON Lines record sink
//!
//! One record per line. Each line is serialized in full before it is written
//! with a single `write_all`, then flushed, so a crash can leave at most one
//! partial trailing line. [`read_records`] skips such a line.

use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use crate::storage::PageRecord;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Appends page records to a `.jl` file
pub struct JsonlSink {
    path: PathBuf,
    file: File,
    appended: u64,
}

impl JsonlSink {
    /// Opens (or creates) the record log for appending
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            appended: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonlSink {
    fn append(&mut self, record: &PageRecord) -> StorageResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        self.appended += 1;
        Ok(())
    }

    fn appended(&self) -> u64 {
        self.appended
    }
}

/// Reads every complete record from a record log
///
/// A trailing line without a newline is a torn write and is ignored. A
/// complete line that fails to parse is reported as corrupt.
pub fn read_records(path: &Path) -> StorageResult<Vec<PageRecord>> {
    if !path.exists() {
        return Err(StorageError::WorkspaceNotFound(path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut line = String::new();
    let mut line_no = 0;

    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        line_no += 1;

        if !line.ends_with('\n') {
            tracing::warn!("Ignoring partial record at line {} of {}", line_no, path.display());
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record = serde_json::from_str(trimmed).map_err(|e| StorageError::CorruptRecord {
            line: line_no,
            message: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}
