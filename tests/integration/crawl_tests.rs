//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawls into temporary workspaces.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};
use trawl::crawler::{crawl, Controller};
use trawl::output::export_records;
use trawl::storage::{load_workspace_records, EVENT_LOG_FILE, MANIFEST_FILE};
use trawl::{CrawlJob, CrawlStatus, PageRecord};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a job crawling `paths` on the mock server into a fresh directory
fn create_test_job(base_url: &str, paths: &[&str], root: &TempDir) -> CrawlJob {
    let seeds = paths.iter().map(|p| format!("{}{}", base_url, p)).collect();
    let mut job = CrawlJob::new("test_crawl", seeds);
    job.user_agent = "TestBot/1.0".to_string();
    job.output.workspace_root = root.path().to_path_buf();
    job.fetcher.workers = 4;
    job.fetcher.request_timeout_ms = 2_000;
    job
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn records_of(workspace: &Path) -> Vec<PageRecord> {
    load_workspace_records(workspace).expect("Failed to read records")
}

fn record_for<'a>(records: &'a [PageRecord], base_url: &str, page: &str) -> &'a PageRecord {
    let url = format!("{}{}", base_url, page);
    records
        .iter()
        .find(|r| r.url == url)
        .unwrap_or_else(|| panic!("No record for {}", url))
}

#[tokio::test]
async fn test_list_mode_fetches_each_seed_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<title>A</title><a href=\"/b\">B</a>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<title>B</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    // "/a#top" normalizes to the same URL as "/a"
    let job = create_test_job(&base_url, &["/a", "/b", "/a#top"], &dir);

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 0);

    let records = records_of(&report.workspace);
    assert_eq!(records.len(), 2);
    let a = record_for(&records, &base_url, "/a");
    assert_eq!(a.status, Some(200));
    assert_eq!(a.depth, 0);
    assert_eq!(a.title.as_deref(), Some("A"));
    assert_eq!(a.links, vec![format!("{}/b", base_url)]);
    assert!(a.referrer.is_none());
}

#[tokio::test]
async fn test_follow_links_fetches_duplicates_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <a href="/x">X</a>
        <a href="/x#again">X again</a>
        <a href="/y">Y</a>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html("<title>X</title><a href=\"/\">home</a><a href=\"/y\">y</a>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y"))
        .respond_with(html("<title>Y</title><a href=\"/x\">x</a>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_fetched, 3);

    let records = records_of(&report.workspace);
    assert_eq!(records.len(), 3);

    let urls: HashSet<_> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), records.len(), "duplicate URL in record log");

    let x = record_for(&records, &base_url, "/x");
    assert_eq!(x.depth, 1);
    assert_eq!(x.referrer, Some(format!("{}/", base_url)));
}

#[tokio::test]
async fn test_repeated_link_yields_two_records() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/x">first</a><a href="/x">second</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html("<title>X</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(records_of(&report.workspace).len(), 2);
}

#[tokio::test]
async fn test_budget_limits_records() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/one", "<title>One</title>").await;
    mount_page(&server, "/two", "<title>Two</title>").await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/one", "/two"], &dir);
    job.max_pages = 1;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::BudgetExhausted);
    assert_eq!(report.pages_fetched, 1);

    let records = records_of(&report.workspace);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("{}/one", base_url));
}

#[tokio::test]
async fn test_budget_not_reached_completes() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", "<a href=\"/next\">next</a>").await;
    mount_page(&server, "/next", "<title>Next</title>").await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;
    job.max_pages = 10;

    let report = crawl(job).await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_fetched, 2);
}

#[tokio::test]
async fn test_budget_caps_followed_links() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    let links: String = (0..10)
        .map(|i| format!("<a href=\"/p{}\">{}</a>", i, i))
        .collect();
    mount_page(&server, "/", &links).await;
    Mock::given(method("GET"))
        .respond_with(html("<title>leaf</title>"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;
    job.max_pages = 4;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::BudgetExhausted);
    assert_eq!(records_of(&report.workspace).len(), 4);
}

#[tokio::test]
async fn test_existing_workspace_is_setup_error() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<title>Home</title>"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let existing = dir.path().join("test_crawl");
    std::fs::create_dir(&existing).unwrap();
    std::fs::write(existing.join("notes.txt"), "keep me").unwrap();

    let job = create_test_job(&base_url, &["/"], &dir);
    let controller = Controller::new(job);
    let status = controller.subscribe();

    let err = controller.run().await.unwrap_err();
    assert!(err.is_setup_error(), "unexpected error: {}", err);
    assert_eq!(status.borrow().status, CrawlStatus::Aborted);

    assert_eq!(
        std::fs::read_to_string(existing.join("notes.txt")).unwrap(),
        "keep me"
    );
    assert!(!existing.join(MANIFEST_FILE).exists());
}

#[tokio::test]
async fn test_excluded_param_never_fetched() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/list?page=2">next</a>
        <a href="/list?page=2&sessionid=abc">session</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(wiremock::matchers::query_param("sessionid", "abc"))
        .respond_with(html("<title>Session</title>"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/list", "<title>List</title>").await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;
    job.filters.exclude_url_params = vec!["sessionid".to_string()];

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.pages_fetched, 2);

    let records = records_of(&report.workspace);
    assert!(records.iter().all(|r| !r.url.contains("sessionid")));
    // The page still reports every link it contains
    let home = record_for(&records, &base_url, "/");
    assert_eq!(home.links.len(), 2);
}

#[tokio::test]
async fn test_exclude_regex_and_allowed_domains() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/keep">keep</a>
        <a href="/private/secret">secret</a>
        <a href="http://elsewhere.invalid/">offsite</a>"#,
    )
    .await;
    mount_page(&server, "/keep", "<title>Keep</title>").await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html("<title>Secret</title>"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;
    job.filters.exclude_url_regex = vec!["/private/".to_string()];

    let report = Controller::new(job).run().await.expect("Crawl failed");
    let records = records_of(&report.workspace);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| !r.url.contains("elsewhere")));
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", "<a href=\"/level1\">1</a>").await;
    mount_page(&server, "/level1", "<a href=\"/level2\">2</a>").await;
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html("<title>Level 2</title>"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;
    job.max_depth = 1;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_fetched, 2);

    let records = records_of(&report.workspace);
    let level1 = record_for(&records, &base_url, "/level1");
    assert_eq!(level1.depth, 1);
    assert_eq!(level1.links, vec![format!("{}/level2", base_url)]);
}

#[tokio::test]
async fn test_http_error_produces_error_record() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/ok", "<title>OK</title>").await;

    let dir = tempdir().unwrap();
    let job = create_test_job(&base_url, &["/missing", "/ok"], &dir);

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 1);

    let records = records_of(&report.workspace);
    let missing = record_for(&records, &base_url, "/missing");
    assert_eq!(missing.status, Some(404));
    assert_eq!(missing.error.as_deref(), Some("HTTP 404 Not Found"));
    assert!(record_for(&records, &base_url, "/ok").is_success());
}

#[tokio::test]
async fn test_timeout_produces_error_record() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<title>Slow</title>").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/slow"], &dir);
    job.fetcher.request_timeout_ms = 200;
    job.fetcher.obey_robots = false;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_failed, 1);

    let records = records_of(&report.workspace);
    assert_eq!(records.len(), 1);
    assert!(records[0].status.is_none());
    assert_eq!(records[0].error.as_deref(), Some("Request timeout"));
}

#[tokio::test]
async fn test_robots_disallowed_produces_error_record() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/allowed">Allowed</a><a href="/admin">Admin</a>"#,
    )
    .await;
    mount_page(&server, "/allowed", "<title>Allowed</title>").await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html("<title>Admin</title>"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.pages_failed, 1);

    let records = records_of(&report.workspace);
    let admin = record_for(&records, &base_url, "/admin");
    assert_eq!(admin.error.as_deref(), Some("disallowed by robots.txt"));
    assert!(admin.status.is_none());
}

#[tokio::test]
async fn test_redirect_target_not_fetched_again() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html(r#"<title>New</title><a href="/new">self</a><a href="/old">old</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/old"], &dir);
    job.follow_links = true;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.pages_fetched, 1);

    let records = records_of(&report.workspace);
    assert_eq!(records[0].url, format!("{}/old", base_url));
    assert_eq!(records[0].final_url, Some(format!("{}/new", base_url)));
    assert_eq!(records[0].title.as_deref(), Some("New"));
}

#[tokio::test]
async fn test_politeness_delay_spaces_requests() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .respond_with(html("<title>page</title>"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/a", "/b", "/c"], &dir);
    job.fetcher.politeness_delay_ms = 200;
    job.fetcher.obey_robots = false;

    let started = Instant::now();
    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.pages_fetched, 3);
    assert!(
        started.elapsed() >= Duration::from_millis(400),
        "three requests to one host finished in {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_cancellation_aborts_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    let links: String = (0..10)
        .map(|i| format!("<a href=\"/p{}\">{}</a>", i, i))
        .collect();
    mount_page(&server, "/", &links).await;
    Mock::given(method("GET"))
        .respond_with(html("<title>leaf</title>").set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;
    job.fetcher.workers = 1;
    job.fetcher.obey_robots = false;

    let controller = Controller::new(job);
    let cancel = controller.cancel_token();
    let mut snapshots = controller.subscribe();
    tokio::spawn(async move {
        let _ = snapshots.wait_for(|s| s.pages_fetched >= 1).await;
        cancel.cancel();
    });

    let report = controller.run().await.expect("Cancellation is not an error");
    assert_eq!(report.status, CrawlStatus::Aborted);
    assert!(report.pages_fetched >= 1);
    assert!(report.pages_fetched < 11);

    // Every counted page made it to the log
    let records = records_of(&report.workspace);
    assert_eq!(records.len() as u64, report.pages_fetched);
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cancel_during_crawl_delay_returns_promptly() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_robots(&server, "User-agent: *\nCrawl-delay: 30").await;
    Mock::given(method("GET"))
        .respond_with(html("<title>page</title>"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let job = create_test_job(&base_url, &["/a", "/b", "/c"], &dir);

    let controller = Controller::new(job);
    let cancel = controller.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), controller.run())
        .await
        .expect("Crawl did not stop after cancellation")
        .expect("Cancellation is not an error");
    assert_eq!(report.status, CrawlStatus::Aborted);
    assert!(report.pages_fetched <= 1);

    // Entries skipped while waiting leave no record
    let records = records_of(&report.workspace);
    assert_eq!(records.len() as u64, report.pages_fetched);
}

#[tokio::test]
async fn test_huge_crawl_delay_does_not_stall_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_robots(&server, "User-agent: *\nCrawl-delay: 1e30").await;
    mount_page(&server, "/", "<title>Home</title>").await;

    let dir = tempdir().unwrap();
    let job = create_test_job(&base_url, &["/"], &dir);

    let report = tokio::time::timeout(Duration::from_secs(5), Controller::new(job).run())
        .await
        .expect("Crawl stalled on Crawl-delay")
        .expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_fetched, 1);

    let records = records_of(&report.workspace);
    assert_eq!(records.len(), 1);
    assert!(records[0].is_success());
    assert_eq!(records[0].title.as_deref(), Some("Home"));
}

#[tokio::test]
async fn test_invalid_seeds_are_skipped() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<title>Home</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut job = CrawlJob::new(
        "test_crawl",
        vec![
            format!("{}/", base_url),
            "not a url".to_string(),
            "ftp://files.test/".to_string(),
        ],
    );
    job.output.workspace_root = dir.path().to_path_buf();
    job.fetcher.obey_robots = false;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.pages_failed, 0);

    let records = records_of(&report.workspace);
    assert_eq!(records.len(), 1);
    assert_eq!(record_for(&records, &base_url, "/").status, Some(200));
}

#[tokio::test]
async fn test_workspace_contents_and_export() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title>
        <meta name="description" content="The home page">
        </head><body><h1>Welcome</h1><a href="/about">About</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/about", "<title>About</title>").await;

    let dir = tempdir().unwrap();
    let mut job = create_test_job(&base_url, &["/"], &dir);
    job.follow_links = true;

    let report = Controller::new(job).run().await.expect("Crawl failed");
    let workspace = &report.workspace;

    assert!(workspace.join(MANIFEST_FILE).exists());
    let events = std::fs::read_to_string(workspace.join(EVENT_LOG_FILE)).unwrap();
    assert!(events.contains("Crawl started"));
    assert!(events.contains("Crawl finished: completed"));

    let records = records_of(workspace);
    let home = record_for(&records, &base_url, "/");
    assert_eq!(home.meta_description.as_deref(), Some("The home page"));
    assert_eq!(home.h1, vec!["Welcome".to_string()]);
    assert_eq!(
        home.headers.get("content-type").map(String::as_str),
        Some("text/html")
    );

    let csv_path = dir.path().join("pages.csv");
    export_records(&records, &csv_path).expect("Export failed");
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    assert_eq!(reader.records().count(), records.len());
}
