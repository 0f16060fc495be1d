//! End-to-end crawl tests against wiremock servers

mod crawl_tests;
