//! SQLite export
//!
//! Writes records into a `pages` table of a new SQLite database, all in one
//! transaction. Header maps and link lists are stored as JSON text.

use crate::output::traits::{Exporter, OutputError, OutputResult};
use crate::storage::PageRecord;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE pages (
    id INTEGER PRIMARY KEY,
    url TEXT NOT NULL UNIQUE,
    final_url TEXT,
    status INTEGER,
    depth INTEGER NOT NULL,
    referrer TEXT,
    content_type TEXT,
    title TEXT,
    meta_description TEXT,
    h1 TEXT NOT NULL,
    canonical TEXT,
    size INTEGER NOT NULL,
    links TEXT NOT NULL,
    headers TEXT NOT NULL,
    crawl_time TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    error TEXT
);

CREATE INDEX idx_pages_status ON pages(status);
CREATE INDEX idx_pages_depth ON pages(depth);
"#;

pub struct SqliteExporter;

impl Exporter for SqliteExporter {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn export(&self, records: &[PageRecord], path: &Path) -> OutputResult<()> {
        if path.exists() {
            return Err(OutputError::TargetExists(path.to_path_buf()));
        }

        let mut conn = Connection::open(path)?;
        write_records(&mut conn, records)
    }
}

fn write_records(conn: &mut Connection, records: &[PageRecord]) -> OutputResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO pages (url, final_url, status, depth, referrer, content_type, title,
                meta_description, h1, canonical, size, links, headers, crawl_time, elapsed_ms, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )?;

        for record in records {
            stmt.execute(params![
                record.url,
                record.final_url,
                record.status,
                record.depth,
                record.referrer,
                record.content_type,
                record.title,
                record.meta_description,
                serde_json::to_string(&record.h1)?,
                record.canonical,
                record.size as i64,
                serde_json::to_string(&record.links)?,
                serde_json::to_string(&record.headers)?,
                record.crawl_time.to_rfc3339(),
                record.elapsed_ms as i64,
                record.error,
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}
