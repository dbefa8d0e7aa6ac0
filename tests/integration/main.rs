//! Integration tests for the crawl-and-extract pipeline
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! crawl engine and pipeline end-to-end.

mod crawl_tests;
mod pipeline_tests;
mod policy_tests;
