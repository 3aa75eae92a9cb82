//! End-to-end session tests with fake capabilities

use crate::common::*;
use pagesift::crawler::FetchError;
use pagesift::ocr::OcrEngineError;
use pagesift::storage::SqliteTracker;
use pagesift::{OcrStatus, ScrapeError, ScrapeMode, Session, TargetUrl};
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

fn not_stopped() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[tokio::test]
async fn test_image_without_text_is_classified_no_text_found() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page(
            "https://example.com/",
            Ok(page_with_images("Welcome", &["/blank.png"])),
        )
        .image("https://example.com/blank.png", Ok(png(1)));

    let mut session =
        Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    assert_eq!(summary.images_total, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.ocr_status_counts.get(OcrStatus::NoTextFound), 1);
    assert_eq!(summary.success_rate, 1.0);
}

#[tokio::test]
async fn test_render_failing_once_is_retried() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page("https://example.com/", Err(unavailable("https://example.com/")))
        .page("https://example.com/", Ok(page_with_images("Hello", &[])));

    let mut session =
        Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    assert_eq!(renderer.render_calls(), 2);
    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn test_one_failed_download_does_not_fail_page() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page(
            "https://example.com/",
            Ok(page_with_images("Gallery", &["/a.png", "/b.png", "/c.png"])),
        )
        .image("https://example.com/a.png", Ok(png(1)))
        .image(
            "https://example.com/b.png",
            Err(FetchError::Http {
                url: "https://example.com/b.png".to_string(),
                status: 404,
            }),
        )
        .image("https://example.com/c.png", Ok(png(3)));
    ocr.answer(png(1), Ok("Opening hours".to_string()))
        .answer(png(3), Ok("  Call us  ".to_string()));

    let mut session =
        Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.images_total, 3);
    assert_eq!(summary.ocr_status_counts.success, 2);
    assert_eq!(summary.ocr_status_counts.error_download_failed, 1);
    assert_eq!(ocr.calls(), 2);

    let page_dir = session.output().pages_dir("example_com");
    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(page_dir.join("text.json")).unwrap()).unwrap();
    assert_eq!(meta["failed_images_download"][0], "https://example.com/b.png");

    let ocr_summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(page_dir.join("ocr/summary.json")).unwrap())
            .unwrap();
    assert_eq!(ocr_summary["total_ocr_text"], "Opening hours\n\nCall us");
    assert_eq!(ocr_summary["image_summaries"][1]["ocr_status"], "error_download_failed");

    let images = fs::read_dir(session.output().images_dir("example_com"))
        .unwrap()
        .count();
    assert_eq!(images, 2);
}

#[tokio::test]
async fn test_engine_errors_map_to_statuses() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page(
            "https://example.com/",
            Ok(page_with_images("x", &["/1.png", "/2.png", "/3.png"])),
        )
        .image("https://example.com/1.png", Ok(png(1)))
        .image("https://example.com/2.png", Ok(png(2)))
        .image("https://example.com/3.png", Ok(png(3)));
    ocr.answer(png(1), Err(OcrEngineError::UnsupportedFormat("svg".to_string())))
        .answer(png(2), Err(OcrEngineError::Timeout))
        .answer(png(3), Err(OcrEngineError::Processing("crashed".to_string())));

    let mut session =
        Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    let counts = &summary.ocr_status_counts;
    assert_eq!(counts.error_unsupported_format, 1);
    assert_eq!(counts.error_timeout, 1);
    assert_eq!(counts.error_processing, 1);
    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn test_text_mode_skips_images() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page(
            "https://example.com/",
            Ok(page_with_images("Only text", &["/a.png", "/b.png"])),
        )
        .image("https://example.com/a.png", Ok(png(1)));

    let mut config = test_config(dir.path());
    config.scrape.mode = ScrapeMode::Text;

    let mut session = Session::new(config, untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    assert_eq!(summary.ocr_status_counts.skipped, 2);
    assert_eq!(renderer.download_calls(), 0);
    assert_eq!(ocr.calls(), 0);

    let page_dir = session.output().pages_dir("example_com");
    assert_eq!(fs::read_to_string(page_dir.join("text.txt")).unwrap(), "Only text");
    assert!(!page_dir.join("ocr").exists());
}

#[tokio::test]
async fn test_image_cap_skips_the_rest() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page(
            "https://example.com/",
            Ok(page_with_images("x", &["/a.png", "/b.png", "/c.png"])),
        )
        .image("https://example.com/a.png", Ok(png(1)));

    let mut config = test_config(dir.path());
    config.scrape.max_images_per_page = Some(1);

    let mut session = Session::new(config, untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    assert_eq!(summary.ocr_status_counts.no_text_found, 1);
    assert_eq!(summary.ocr_status_counts.skipped, 2);
    assert_eq!(renderer.download_calls(), 1);
}

#[tokio::test]
async fn test_invalid_and_missing_pages_fail_individually() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer.page("https://good.example.com/", Ok(page_with_images("ok", &[])));

    let mut session =
        Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(
            vec![
                TargetUrl::new("not a url"),
                TargetUrl::new("https://missing.example.com/"),
                TargetUrl::new("https://good.example.com/"),
            ],
            not_stopped(),
        )
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failed_urls[0].url, "not a url");
    assert!(summary.failed_urls[1].error.contains("404"));
    // The invalid URL never reaches the renderer; the 404 is not retried
    assert_eq!(renderer.render_calls(), 2);
}

#[tokio::test]
async fn test_exhausted_retries_report_attempts() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    for _ in 0..3 {
        renderer.page("https://example.com/", Err(unavailable("https://example.com/")));
    }

    let mut config = test_config(dir.path());
    config.retry.page.max_retries = 2;

    let mut session = Session::new(config, untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    assert_eq!(renderer.render_calls(), 3);
    assert_eq!(summary.failed, 1);
    assert!(summary.failed_urls[0].error.contains("after 3 attempts"));
}

#[tokio::test]
async fn test_stop_signal_prevents_attempts() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();

    let mut session =
        Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    let summary = session
        .run(
            vec![TargetUrl::new("https://example.com/")],
            Arc::new(AtomicBool::new(true)),
        )
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.attempted, 0);
    assert_eq!(renderer.render_calls(), 0);
}

#[tokio::test]
async fn test_run_summary_written() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer.page("https://example.com/", Ok(page_with_images("hi", &[])));

    let mut config = test_config(dir.path());
    config.output.run_name = Some("smoke test".to_string());

    let mut session = Session::new(config, untracked(&renderer, &ocr)).unwrap();
    assert!(session.run_id().starts_with("smoke_test_"));

    session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    let run_dir = session.output().run_dir();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(json["completed"], 1);
    assert_eq!(json["tracking"]["backend"], "none");
    assert_eq!(
        fs::read_to_string(run_dir.join("pages/example_com/url.txt")).unwrap(),
        "https://example.com/"
    );
}

#[tokio::test]
async fn test_deep_pages_of_one_host_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page("https://example.com/", Ok(page_with_images("home", &[])))
        .page("https://example.com/about", Ok(page_with_images("about", &[])));

    let mut session =
        Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    session
        .run(
            vec![
                TargetUrl::new("https://example.com/"),
                TargetUrl::new("https://example.com/about"),
            ],
            not_stopped(),
        )
        .await
        .unwrap();

    let pages = fs::read_dir(session.output().run_dir().join("pages"))
        .unwrap()
        .count();
    assert_eq!(pages, 2);
}

#[tokio::test]
async fn test_empty_target_list_is_rejected() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();

    let mut session = Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    let result = session.run(Vec::new(), not_stopped()).await;

    assert!(matches!(result, Err(ScrapeError::NoTargets(_))));
    assert!(!session.output().run_dir().exists());
}

#[tokio::test]
async fn test_unwritable_page_file_fails_the_url() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page("https://example.com/", Ok(page_with_images("blocked", &[])))
        .page("https://other.example.com/", Ok(page_with_images("fine", &[])));

    let mut session = Session::new(test_config(dir.path()), untracked(&renderer, &ocr)).unwrap();
    // A directory where page.html should go
    fs::create_dir_all(session.output().pages_dir("example_com").join("page.html")).unwrap();

    let summary = session
        .run(
            vec![
                TargetUrl::new("https://example.com/"),
                TargetUrl::new("https://other.example.com/"),
            ],
            not_stopped(),
        )
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed_urls[0].url, "https://example.com/");
    assert!(summary.failed_urls[0].error.contains("Failed to save files"));
}

#[tokio::test]
async fn test_unwritable_ocr_dir_keeps_the_url_completed() {
    let dir = TempDir::new().unwrap();
    let renderer = FakeRenderer::new();
    let ocr = FakeOcr::new();
    renderer
        .page(
            "https://example.com/",
            Ok(page_with_images("text", &["/a.png"])),
        )
        .image("https://example.com/a.png", Ok(png(1)));
    ocr.answer(png(1), Ok("Sale".to_string()));

    let mut config = test_config(dir.path());
    config.tracking.enabled = true;
    let tracker = Box::new(
        SqliteTracker::new(&config.tracking.database_path, &config.tracking.source_tag).unwrap(),
    );
    let mut session = Session::new(config.clone(), capabilities(&renderer, &ocr, tracker)).unwrap();
    let page_dir = session.output().pages_dir("example_com");
    fs::create_dir_all(&page_dir).unwrap();
    fs::write(page_dir.join("ocr"), "not a directory").unwrap();

    let summary = session
        .run(vec![TargetUrl::new("https://example.com/")], not_stopped())
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.ocr_status_counts.success, 1);
    assert!(page_dir.join("page.html").is_file());
    assert!(page_dir.join("text.json").is_file());

    let tracker =
        SqliteTracker::new(&config.tracking.database_path, &config.tracking.source_tag).unwrap();
    let notes = tracker.page_notes_for_url("https://example.com/").unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].as_deref().unwrap_or("").contains("ocr"));
}
