//! Durable tracking across runs

use crate::common::*;
use pagesift::crawler::FetchError;
use pagesift::storage::{SqliteTracker, StateTracker, UNAVAILABLE_BACKEND};
use pagesift::{Capabilities, ScrapeStatus, Session, TargetUrl};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

fn tracked_config(dir: &TempDir) -> pagesift::Config {
    let mut config = test_config(dir.path());
    config.tracking.enabled = true;
    config
}

fn open(config: &pagesift::Config) -> SqliteTracker {
    SqliteTracker::new(&config.tracking.database_path, &config.tracking.source_tag).unwrap()
}

async fn run_once(
    config: &pagesift::Config,
    renderer: &Arc<FakeRenderer>,
    targets: Vec<TargetUrl>,
) -> pagesift::RunSummary {
    let ocr = FakeOcr::new();
    let tracker = Box::new(open(config));
    let mut session = Session::new(config.clone(), capabilities(renderer, &ocr, tracker)).unwrap();
    session
        .run(targets, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_completed_url_is_skipped_without_rendering() {
    let dir = TempDir::new().unwrap();
    let config = tracked_config(&dir);

    {
        let mut tracker = open(&config);
        let target = TargetUrl::new("https://example.com/");
        let id = tracker.mark_pending(&target).unwrap();
        tracker
            .mark_result(id, ScrapeStatus::Completed, None)
            .unwrap();
    }

    let renderer = FakeRenderer::new();
    let summary = run_once(&config, &renderer, vec![TargetUrl::new("https://example.com/")]).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.attempted, 0);
    assert_eq!(renderer.render_calls(), 0);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = tracked_config(&dir);
    let renderer = FakeRenderer::new();
    renderer.page("https://example.com/", Ok(page_with_images("hi", &[])));

    let targets = vec![TargetUrl::new("https://example.com/").with_external_id("c-1")];

    let first = run_once(&config, &renderer, targets.clone()).await;
    assert_eq!(first.completed, 1);
    assert_eq!(first.tracking.backend, "sqlite");
    assert!(first.tracking.errors.is_empty());

    let second = run_once(&config, &renderer, targets).await;
    assert_eq!(second.completed, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(renderer.render_calls(), 1);

    let tracker = open(&config);
    let logs = tracker.logs_for_url("https://example.com/").unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, ScrapeStatus::Completed);
    assert_eq!(logs[0].external_id.as_deref(), Some("c-1"));
    assert_eq!(logs[0].source_tag.as_deref(), Some("homepage"));
    assert_eq!(tracker.count_scraped_pages().unwrap(), 1);
}

#[tokio::test]
async fn test_failed_url_is_recorded_and_retried_next_run() {
    let dir = TempDir::new().unwrap();
    let config = tracked_config(&dir);
    let renderer = FakeRenderer::new();
    renderer
        .page(
            "https://example.com/",
            Err(FetchError::Http {
                url: "https://example.com/".to_string(),
                status: 403,
            }),
        )
        .page("https://example.com/", Ok(page_with_images("back", &[])));

    let first = run_once(&config, &renderer, vec![TargetUrl::new("https://example.com/")]).await;
    assert_eq!(first.failed, 1);

    {
        let tracker = open(&config);
        let logs = tracker.logs_for_url("https://example.com/").unwrap();
        assert_eq!(logs[0].status, ScrapeStatus::Failed);
        assert!(logs[0]
            .error_message
            .as_deref()
            .unwrap_or("")
            .contains("403"));
        assert_eq!(tracker.count_scraped_pages().unwrap(), 0);
    }

    let second = run_once(&config, &renderer, vec![TargetUrl::new("https://example.com/")]).await;
    assert_eq!(second.completed, 1);

    let tracker = open(&config);
    assert_eq!(tracker.count_by_status(ScrapeStatus::Failed).unwrap(), 1);
    assert_eq!(tracker.count_by_status(ScrapeStatus::Completed).unwrap(), 1);
    assert_eq!(tracker.count_by_status(ScrapeStatus::Pending).unwrap(), 0);
}

#[tokio::test]
async fn test_every_attempted_url_ends_terminal() {
    let dir = TempDir::new().unwrap();
    let config = tracked_config(&dir);
    let renderer = FakeRenderer::new();
    renderer
        .page("https://a.example.com/", Ok(page_with_images("a", &[])))
        .page("https://c.example.com/", Ok(page_with_images("c", &[])));

    let summary = run_once(
        &config,
        &renderer,
        vec![
            TargetUrl::new("https://a.example.com/"),
            TargetUrl::new("https://b.example.com/"),
            TargetUrl::new("https://c.example.com/"),
        ],
    )
    .await;

    assert_eq!(summary.completed + summary.failed, summary.attempted);

    let tracker = open(&config);
    assert_eq!(tracker.count_by_status(ScrapeStatus::Pending).unwrap(), 0);
    assert_eq!(tracker.count_by_status(ScrapeStatus::Completed).unwrap(), 2);
    assert_eq!(tracker.count_by_status(ScrapeStatus::Failed).unwrap(), 1);
}

#[tokio::test]
async fn test_external_id_scopes_completion() {
    let dir = TempDir::new().unwrap();
    let config = tracked_config(&dir);
    let renderer = FakeRenderer::new();
    renderer
        .page("https://example.com/", Ok(page_with_images("one", &[])))
        .page("https://example.com/", Ok(page_with_images("two", &[])));

    run_once(
        &config,
        &renderer,
        vec![TargetUrl::new("https://example.com/").with_external_id("c-1")],
    )
    .await;
    let summary = run_once(
        &config,
        &renderer,
        vec![TargetUrl::new("https://example.com/").with_external_id("c-2")],
    )
    .await;

    assert_eq!(summary.completed, 1);
    assert_eq!(renderer.render_calls(), 2);
}

#[tokio::test]
async fn test_unopenable_store_falls_back_to_file_only() {
    let dir = TempDir::new().unwrap();
    let mut config = tracked_config(&dir);
    let blocker = dir.path().join("regular_file");
    std::fs::write(&blocker, "not a directory").unwrap();
    config.tracking.database_path = blocker.join("track.db");

    let renderer = FakeRenderer::new();
    renderer.page("https://example.com/", Ok(page_with_images("still here", &[])));
    let ocr = FakeOcr::new();

    let mut capabilities = Capabilities::from_config(&config).unwrap();
    capabilities.renderer = renderer.clone();
    capabilities.ocr = ocr.clone();
    let mut session = Session::new(config, capabilities).unwrap();

    let summary = session
        .run(
            vec![TargetUrl::new("https://example.com/")],
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.tracking.backend, UNAVAILABLE_BACKEND);
    assert_eq!(summary.tracking.errors.len(), 1);
    assert!(summary.tracking.errors[0].contains("track.db"));
    assert!(session
        .output()
        .pages_dir("example_com")
        .join("page.html")
        .is_file());
}

#[tokio::test]
async fn test_broken_store_does_not_stop_processing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let renderer = FakeRenderer::new();
    renderer
        .page("https://a.example.com/", Ok(page_with_images("a", &[])))
        .page("https://b.example.com/", Ok(page_with_images("b", &[])));
    let ocr = FakeOcr::new();

    let tracker = Box::new(FailingTracker::always());
    let mut session = Session::new(config, capabilities(&renderer, &ocr, tracker)).unwrap();
    let summary = session
        .run(
            vec![
                TargetUrl::new("https://a.example.com/"),
                TargetUrl::new("https://b.example.com/"),
            ],
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.tracking.backend, "failing");
    // One completion check and one pending row per URL
    assert_eq!(summary.tracking.errors.len(), 4);
    assert!(summary
        .tracking
        .errors
        .iter()
        .any(|e| e.contains("mark_pending")));
}

#[tokio::test]
async fn test_failed_transitions_are_reported() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let renderer = FakeRenderer::new();
    renderer.page("https://a.example.com/", Ok(page_with_images("a", &[])));
    let ocr = FakeOcr::new();

    let tracker = Box::new(FailingTracker::after_pending());
    let mut session = Session::new(config, capabilities(&renderer, &ocr, tracker)).unwrap();
    let summary = session
        .run(
            vec![
                TargetUrl::new("https://a.example.com/"),
                TargetUrl::new("https://b.example.com/"),
            ],
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed + summary.failed, summary.attempted);

    let errors = &summary.tracking.errors;
    let count = |op: &str| errors.iter().filter(|e| e.contains(op)).count();
    assert_eq!(count("is_already_completed"), 2);
    assert_eq!(count("mark_result"), 2);
    assert_eq!(count("record_page"), 1);
    assert_eq!(count("mark_pending"), 0);
}
