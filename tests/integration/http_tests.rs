//! HTTP renderer tests against mock servers

use crate::common::*;
use pagesift::config::UserAgentConfig;
use pagesift::crawler::{FetchError, HttpRenderer, PageRenderer};
use pagesift::{Session, TargetUrl};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn renderer() -> HttpRenderer {
    HttpRenderer::from_config(&UserAgentConfig::default(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_render_returns_html() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header_exists("user-agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>Hello</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
    let page = renderer().render(&url).await.unwrap();

    assert_eq!(page.html, "<html><body>Hello</body></html>");
    assert_eq!(page.final_url, url);
}

#[tokio::test]
async fn test_render_maps_status_codes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let gone = Url::parse(&format!("{}/gone", mock_server.uri())).unwrap();
    let busy = Url::parse(&format!("{}/busy", mock_server.uri())).unwrap();

    let err = renderer().render(&gone).await.unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 404, .. }));
    assert!(!err.is_transient());

    let err = renderer().render(&busy).await.unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_download_returns_bytes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png(7)))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/logo.png", mock_server.uri())).unwrap();
    let bytes = renderer().download(&url).await.unwrap();

    assert_eq!(bytes, png(7));
}

#[tokio::test]
async fn test_session_over_http() {
    let mock_server = MockServer::start().await;
    let html = page_with_images("Served over HTTP", &["/logo.png"]);
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png(9)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let ocr = FakeOcr::new();
    ocr.answer(png(9), Ok("ACME Corp".to_string()));

    let capabilities = pagesift::Capabilities {
        renderer: Arc::new(renderer()),
        ocr: ocr.clone(),
        tracker: Box::new(pagesift::storage::NoopTracker::new()),
    };
    let mut session = Session::new(test_config(dir.path()), capabilities).unwrap();
    let summary = session
        .run(
            vec![TargetUrl::new(format!("{}/", mock_server.uri()))],
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.ocr_status_counts.success, 1);
}
