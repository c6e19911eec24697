//! Static file serving integration tests.

use axum::http::StatusCode;
use tower::ServiceExt;

use super::test_utils::{body_bytes, get, get_with_encoding, gunzip, header, TestHarness};

#[tokio::test]
async fn test_serves_file_with_content_type() {
    let harness = TestHarness::new();
    harness.add_static_file("css/site.css", b"body { margin: 0 }");
    let router = harness.router().await;

    let response = router.oneshot(get("/css/site.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "content-type"),
        Some("text/css; charset=utf-8")
    );
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), b"body { margin: 0 }");
}

#[tokio::test]
async fn test_directory_serves_index() {
    let harness = TestHarness::new();
    harness.add_static_file("index.html", b"<h1>texserve</h1>");
    harness.add_static_file("docs/index.html", b"<h1>docs</h1>");
    let router = harness.router().await;

    let response = router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"<h1>texserve</h1>");

    let response = router.oneshot(get("/docs")).await.unwrap();
    assert_eq!(body_bytes(response).await.as_ref(), b"<h1>docs</h1>");
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("/nope.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn test_traversal_rejected() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("/%2E%2E/secret.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_text_is_compressed_but_not_cached() {
    let harness = TestHarness::new();
    let page = "<p>The quick brown fox jumps over the lazy dog.</p>".repeat(50);
    harness.add_static_file("page.html", page.as_bytes());
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/page.html", "gzip"))
        .await
        .unwrap();
    assert_eq!(header(&response, "content-encoding"), Some("gzip"));
    assert!(header(&response, "x-artifact-cache").is_none());

    let body = body_bytes(response).await;
    assert_eq!(gunzip(&body), page.as_bytes());
    assert_eq!(harness.cached_file_count(), 0);
}

#[tokio::test]
async fn test_precompressed_media_sent_as_is() {
    let harness = TestHarness::new();
    let jpeg = [&[0xFFu8, 0xD8, 0xFF, 0xE0][..], &[0u8; 4096][..]].concat();
    harness.add_static_file("photo.jpg", &jpeg);
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/photo.jpg", "gzip, br"))
        .await
        .unwrap();
    assert_eq!(header(&response, "content-type"), Some("image/jpeg"));
    assert!(header(&response, "content-encoding").is_none());
    assert_eq!(body_bytes(response).await.len(), jpeg.len());
}

#[tokio::test]
async fn test_unknown_extension_sniffed() {
    let harness = TestHarness::new();
    harness.add_static_file("logo", b"GIF89a\x01\x00\x01\x00");
    let router = harness.router().await;

    let response = router.oneshot(get("/logo")).await.unwrap();
    assert_eq!(header(&response, "content-type"), Some("image/gif"));
}
