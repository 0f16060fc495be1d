//! Trawl main entry point
//!
//! This is the command-line client: it submits a crawl job, shows progress
//! while the crawl runs, and reads finished workspaces back for statistics,
//! exports and previews.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use trawl::config::{load_job_with_hash, CrawlJob};
use trawl::output::{export_records, format_preview, load_statistics, print_statistics};
use trawl::storage::load_workspace_records;
use trawl::{Controller, CrawlSnapshot, CrawlStatus};

/// Trawl: a polite, budgeted web crawler
///
/// Trawl crawls the start URLs of a job file, optionally following links
/// within the allowed domains, and writes one JSON record per page to
/// `<workspace-root>/<project>/crawl.jl`.
#[derive(Parser, Debug)]
#[command(name = "trawl")]
#[command(version)]
#[command(about = "A polite, budgeted web crawler", long_about = None)]
struct Cli {
    /// Path to TOML job file
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the job and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export", "preview"])]
    dry_run: bool,

    /// Show statistics from the job's existing workspace and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export", "preview"])]
    stats: bool,

    /// Export the job's existing records to FILE (.csv, .db, .sqlite or .md) and exit
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Print the first N records of the job's existing workspace and exit
    #[arg(long, value_name = "N")]
    preview: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading job from: {}", cli.job.display());
    let (job, job_hash) = load_job_with_hash(&cli.job)
        .with_context(|| format!("Failed to load job {}", cli.job.display()))?;
    tracing::info!("Job loaded successfully (hash: {})", job_hash);

    if cli.dry_run {
        handle_dry_run(&job, &job_hash);
        return Ok(());
    }

    if cli.stats {
        return handle_stats(&job);
    }

    if cli.export.is_some() || cli.preview.is_some() {
        let workspace = job.workspace_path();
        if let Some(path) = &cli.export {
            handle_export(&workspace, path)?;
        }
        if let Some(rows) = cli.preview {
            handle_preview(&workspace, rows)?;
        }
        return Ok(());
    }

    handle_crawl(job, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("trawl=info,warn"),
            1 => EnvFilter::new("trawl=debug,info"),
            2 => EnvFilter::new("trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated job
fn handle_dry_run(job: &CrawlJob, job_hash: &str) {
    println!("=== Trawl Dry Run ===\n");

    println!("Job:");
    println!("  Project: {}", job.project);
    println!("  Workspace: {}", job.workspace_path().display());
    println!("  Hash: {}", job_hash);
    println!("  User agent: {}", job.user_agent);
    println!(
        "  Mode: {}",
        if job.follow_links { "follow links" } else { "list" }
    );
    match job.budget() {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unlimited"),
    }
    if job.max_depth > 0 {
        println!("  Max depth: {}", job.max_depth);
    }

    println!("\nFetcher:");
    println!("  Workers: {}", job.fetcher.workers);
    println!("  Request timeout: {}ms", job.fetcher.request_timeout_ms);
    println!("  Politeness delay: {}ms", job.fetcher.politeness_delay_ms);
    println!(
        "  Retries: {} (backoff {}ms)",
        job.fetcher.max_retries, job.fetcher.retry_backoff_ms
    );
    println!("  Obey robots.txt: {}", job.fetcher.obey_robots);

    let filters = &job.filters;
    println!("\nFilters:");
    print_list("Include params", &filters.include_url_params);
    print_list("Exclude params", &filters.exclude_url_params);
    print_list("Include regex", &filters.include_url_regex);
    print_list("Exclude regex", &filters.exclude_url_regex);
    print_list("Allowed domains", &filters.allowed_domains);

    println!("\nStart URLs ({}):", job.start_urls.len());
    for url in &job.start_urls {
        println!("  - {}", url);
    }

    if job.workspace_path().exists() {
        println!(
            "\n✗ Workspace {} already exists; choose another project name",
            job.workspace_path().display()
        );
    } else {
        println!("\n✓ Job is valid");
    }
}

fn print_list(label: &str, values: &[String]) {
    if values.is_empty() {
        println!("  {}: (none)", label);
    } else {
        println!("  {}: {}", label, values.join(", "));
    }
}

/// Handles the --stats mode: shows statistics from the workspace
fn handle_stats(job: &CrawlJob) -> Result<()> {
    let workspace = job.workspace_path();
    println!("Workspace: {}\n", workspace.display());

    let records = load_workspace_records(&workspace)
        .with_context(|| format!("Failed to read records from {}", workspace.display()))?;
    print_statistics(&load_statistics(&records));
    Ok(())
}

/// Handles --export: writes the workspace's records to a file
fn handle_export(workspace: &Path, path: &Path) -> Result<()> {
    let records = load_workspace_records(workspace)
        .with_context(|| format!("Failed to read records from {}", workspace.display()))?;
    export_records(&records, path)
        .with_context(|| format!("Failed to export to {}", path.display()))?;
    println!("✓ Exported {} records to {}", records.len(), path.display());
    Ok(())
}

/// Handles --preview: prints the first records as a table
fn handle_preview(workspace: &Path, rows: usize) -> Result<()> {
    let records = load_workspace_records(workspace)
        .with_context(|| format!("Failed to read records from {}", workspace.display()))?;
    print!("{}", format_preview(&records, rows));
    if records.len() > rows {
        println!("({} of {} records shown)", rows, records.len());
    }
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(job: CrawlJob, quiet: bool) -> Result<()> {
    tracing::info!(
        "Crawling {} start URL(s) into {}",
        job.start_urls.len(),
        job.workspace_path().display()
    );

    let controller = Controller::new(job);
    let cancel = controller.cancel_token();
    let snapshots = controller.subscribe();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, finishing in-flight requests...");
                cancel.cancel();
            }
        }
    });

    let progress = (!quiet).then(|| tokio::spawn(show_progress(snapshots)));

    let result = controller.run().await;
    if let Some(progress) = progress {
        progress.abort();
        eprintln!();
    }

    let report = result.context("Crawl failed")?;
    println!(
        "{}: {} ({} pages, {} failed) in {}s",
        report.project,
        report.status,
        report.pages_fetched,
        report.pages_failed,
        report.duration().num_seconds()
    );
    println!("Records: {}", report.workspace.join(trawl::storage::RECORDS_FILE).display());

    if report.status == CrawlStatus::BudgetExhausted {
        println!("Page budget reached; some discovered pages were not fetched.");
    }
    Ok(())
}

/// Redraws a one-line progress indicator whenever the crawl state changes
async fn show_progress(mut snapshots: tokio::sync::watch::Receiver<CrawlSnapshot>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        ticker.tick().await;
        match snapshots.has_changed() {
            Ok(true) => {
                let snapshot = *snapshots.borrow_and_update();
                eprint!(
                    "\r[{}] {} fetched, {} failed, {} remaining   ",
                    snapshot.status,
                    snapshot.pages_fetched,
                    snapshot.pages_failed,
                    snapshot.pages_remaining
                );
            }
            Ok(false) => {}
            Err(_) => break,
        }
    }
}
