//! Markdown summary and record preview
//!
//! The summary is a human-readable report of a finished crawl. The preview
//! renders the first records as a table, one row per page.

use crate::output::stats::{load_statistics, CrawlStatistics};
use crate::output::traits::{Exporter, OutputError, OutputResult};
use crate::storage::PageRecord;
use std::path::Path;

/// Rows shown in the summary's page table
pub const SUMMARY_PREVIEW_ROWS: usize = 50;

const TITLE_WIDTH: usize = 60;

pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn export(&self, records: &[PageRecord], path: &Path) -> OutputResult<()> {
        if path.exists() {
            return Err(OutputError::TargetExists(path.to_path_buf()));
        }

        let project = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("crawl");
        let stats = load_statistics(records);
        std::fs::write(path, format_markdown_summary(project, &stats, records))?;
        Ok(())
    }
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(
    project: &str,
    stats: &CrawlStatistics,
    records: &[PageRecord],
) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Crawl Summary: {}\n\n", project));

    if let (Some(first), Some(last)) = (
        records.iter().map(|r| r.crawl_time).min(),
        records.iter().map(|r| r.crawl_time).max(),
    ) {
        md.push_str("## Run Information\n\n");
        md.push_str(&format!("- **First fetch**: {}\n", first.to_rfc3339()));
        md.push_str(&format!("- **Last fetch**: {}\n", last.to_rfc3339()));
        md.push_str(&format!(
            "- **Span**: {} seconds\n\n",
            (last - first).num_seconds()
        ));
    }

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Pages**: {}\n", stats.total_pages));
    md.push_str(&format!("- **Unique Hosts**: {}\n", stats.unique_hosts));
    md.push_str(&format!("- **Total Links**: {}\n", stats.total_links));
    md.push_str(&format!("- **Failed Pages**: {}\n", stats.failed));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", stats.success_rate()));

    if !stats.status_counts.is_empty() {
        md.push_str("## Status Codes\n\n");
        md.push_str("| Status | Count |\n");
        md.push_str("|--------|-------|\n");
        for (status, count) in &stats.status_counts {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
        md.push('\n');
    }

    if !stats.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &stats.depth_breakdown {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if !stats.error_summary.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| Error | Count |\n");
        md.push_str("|-------|-------|\n");
        let mut errors: Vec<_> = stats.error_summary.iter().collect();
        errors.sort_by(|a, b| b.1.cmp(a.1));
        for (error, count) in errors {
            md.push_str(&format!("| {} | {} |\n", escape_cell(error), count));
        }
        md.push('\n');
    }

    if !records.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str(&format_preview(records, SUMMARY_PREVIEW_ROWS));
        if records.len() > SUMMARY_PREVIEW_ROWS {
            md.push_str(&format!(
                "\n_{} more pages not shown._\n",
                records.len() - SUMMARY_PREVIEW_ROWS
            ));
        }
    }

    md
}

/// Renders the first `limit` records as a markdown table
pub fn format_preview(records: &[PageRecord], limit: usize) -> String {
    let mut table = String::new();
    table.push_str("| URL | Status | Depth | Title | Error |\n");
    table.push_str("|-----|--------|-------|-------|-------|\n");

    for record in records.iter().take(limit) {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            escape_cell(&record.url),
            record
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record.depth,
            escape_cell(&truncate(record.title.as_deref().unwrap_or(""), TITLE_WIDTH)),
            escape_cell(record.error.as_deref().unwrap_or("")),
        ));
    }

    table
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
