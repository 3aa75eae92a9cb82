//! Integration tests for Pagesift
//!
//! These tests drive whole sessions through fake render and OCR capabilities,
//! and exercise the HTTP renderer against wiremock servers.

mod common;
mod http_tests;
mod pipeline_tests;
mod tracking_tests;
