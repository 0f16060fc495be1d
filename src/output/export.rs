//! CSV export
//!
//! One row per record. List-valued columns (`h1`, `links`) are joined with
//! `@@` so the file stays one row per page.

use crate::output::traits::{Exporter, OutputError, OutputResult};
use crate::storage::PageRecord;
use serde::Serialize;
use std::path::Path;

/// Separator for list-valued cells
pub const LIST_SEPARATOR: &str = "@@";

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    url: &'a str,
    final_url: Option<&'a str>,
    status: Option<u16>,
    depth: u32,
    referrer: Option<&'a str>,
    content_type: Option<&'a str>,
    title: Option<&'a str>,
    meta_description: Option<&'a str>,
    h1: String,
    canonical: Option<&'a str>,
    size: u64,
    links_count: usize,
    links: String,
    crawl_time: String,
    elapsed_ms: u64,
    error: Option<&'a str>,
}

impl<'a> From<&'a PageRecord> for CsvRow<'a> {
    fn from(record: &'a PageRecord) -> Self {
        Self {
            url: &record.url,
            final_url: record.final_url.as_deref(),
            status: record.status,
            depth: record.depth,
            referrer: record.referrer.as_deref(),
            content_type: record.content_type.as_deref(),
            title: record.title.as_deref(),
            meta_description: record.meta_description.as_deref(),
            h1: record.h1.join(LIST_SEPARATOR),
            canonical: record.canonical.as_deref(),
            size: record.size,
            links_count: record.links.len(),
            links: record.links.join(LIST_SEPARATOR),
            crawl_time: record.crawl_time.to_rfc3339(),
            elapsed_ms: record.elapsed_ms,
            error: record.error.as_deref(),
        }
    }
}

pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn export(&self, records: &[PageRecord], path: &Path) -> OutputResult<()> {
        if path.exists() {
            return Err(OutputError::TargetExists(path.to_path_buf()));
        }

        let mut writer = csv::Writer::from_path(path)?;
        for record in records {
            writer.serialize(CsvRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}
