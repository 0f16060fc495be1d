//! Output module for exporting and summarizing crawl results
//!
//! This module handles:
//! - Exporting the record log as CSV, SQLite or a markdown summary
//! - Computing and printing crawl statistics
//! - Rendering a preview table of the first records
//!
//! Everything here reads the durable record log, so it works on a finished
//! crawl as well as on one still running.

mod export;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use export::{CsvExporter, LIST_SEPARATOR};
pub use markdown::{format_markdown_summary, format_preview, MarkdownExporter};
pub use sqlite_output::SqliteExporter;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{ExportFormat, Exporter, OutputError, OutputResult};

use crate::storage::PageRecord;
use std::path::Path;

/// Returns the exporter for a format
pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Csv => Box::new(CsvExporter),
        ExportFormat::Sqlite => Box::new(SqliteExporter),
        ExportFormat::Markdown => Box::new(MarkdownExporter),
    }
}

/// Exports records to `path`, choosing the format by extension
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use trawl::output::export_records;
/// use trawl::storage::load_workspace_records;
///
/// let records = load_workspace_records(Path::new("./example_crawl")).unwrap();
/// export_records(&records, Path::new("example.csv")).unwrap();
/// ```
pub fn export_records(records: &[PageRecord], path: &Path) -> OutputResult<ExportFormat> {
    let format = ExportFormat::from_path(path)?;
    let exporter = exporter_for(format);
    exporter.export(records, path)?;
    tracing::info!(
        "Exported {} records as {} to {}",
        records.len(),
        exporter.name(),
        path.display()
    );
    Ok(format)
}
