//! API integration tests for the render endpoints.
//!
//! Tests verify:
//! - The three request shapes (query, body, path)
//! - Failure responses for unparseable requests and failed renders
//! - Response headers

use axum::http::StatusCode;
use serde_json::Value;
use tower::ServiceExt;

use texserve::VariantKind;

use super::test_utils::{
    body_bytes, get, header, mock_svg, post_form, TestHarness, REJECTED_MARKER,
};

// =============================================================================
// Query Shape
// =============================================================================

#[tokio::test]
async fn test_query_render_writes_vector_artifact() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("/tex2svg?tex=x%5E2")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("text/xml"));
    assert_eq!(header(&response, "x-artifact-cache"), Some("miss"));
    assert!(header(&response, "content-encoding").is_none());

    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("x^2").as_slice());

    let file = harness.artifact_path("x^2", VariantKind::RawVector);
    assert_eq!(std::fs::read(file).unwrap(), mock_svg("x^2"));
}

#[tokio::test]
async fn test_repeated_request_is_served_from_cache() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let first = router
        .clone()
        .oneshot(get("/tex2svg?tex=x%5E2"))
        .await
        .unwrap();
    let first_body = body_bytes(first).await;

    let second = router.oneshot(get("/tex2svg?tex=x%5E2")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-artifact-cache"), Some("hit"));
    let second_body = body_bytes(second).await;

    assert_eq!(first_body, second_body);
    assert_eq!(harness.renderer.calls(), 1);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let harness = TestHarness::new();

    let response = harness
        .router()
        .await
        .oneshot(get("/tex2svg?tex=%5Calpha"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A new router over the same directory
    let response = harness
        .router()
        .await
        .oneshot(get("/tex2svg?tex=%5Calpha"))
        .await
        .unwrap();
    assert_eq!(header(&response, "x-artifact-cache"), Some("hit"));
    assert_eq!(harness.renderer.calls(), 1);
}

#[tokio::test]
async fn test_query_parameter_among_others() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .oneshot(get("/tex2svg?scale=2&tex=a%2Bb&color=red"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("a+b").as_slice());
}

#[tokio::test]
async fn test_similar_field_names_are_not_expressions() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .clone()
        .oneshot(get("/tex2svg?vertex=a"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(get("/tex2svg?vertex=a&tex=b"))
        .await
        .unwrap();
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("b").as_slice());
    assert_eq!(harness.renderer.calls(), 1);
}

#[tokio::test]
async fn test_bitmap_endpoint() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .clone()
        .oneshot(get("/tex2png?tex=x%5E2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("image/png"));
    // Bitmaps are not compressed by default
    assert!(header(&response, "content-encoding").is_none());

    let body = body_bytes(response).await;
    assert!(body.starts_with(b"\x89PNG"));
    assert!(harness
        .artifact_path("x^2", VariantKind::RawBitmap)
        .exists());
    assert!(harness
        .artifact_path("x^2", VariantKind::RawVector)
        .exists());

    let again = router.oneshot(get("/tex2png?tex=x%5E2")).await.unwrap();
    assert_eq!(header(&again, "x-artifact-cache"), Some("hit"));
    assert_eq!(harness.renderer.calls(), 1);
    assert_eq!(harness.rasterizer.calls(), 1);
}

// =============================================================================
// Body Shape
// =============================================================================

#[tokio::test]
async fn test_post_body_matches_query() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let posted = router
        .clone()
        .oneshot(post_form("/tex2svg", "tex=1%2B1"))
        .await
        .unwrap();
    assert_eq!(posted.status(), StatusCode::OK);
    let posted_body = body_bytes(posted).await;

    let queried = router.oneshot(get("/tex2svg?tex=1%2B1")).await.unwrap();
    assert_eq!(queried.status(), StatusCode::OK);
    let queried_body = body_bytes(queried).await;

    assert_eq!(posted_body, queried_body);
    assert_eq!(posted_body.as_ref(), mock_svg("1+1").as_slice());
    assert_eq!(harness.renderer.calls(), 1);
}

#[tokio::test]
async fn test_post_body_with_other_fields() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .oneshot(post_form("/tex2png", "format=png&tex=%5Csqrt%7B2%7D&x=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("image/png"));
    assert!(harness
        .artifact_path("\\sqrt{2}", VariantKind::RawBitmap)
        .exists());
}

#[tokio::test]
async fn test_query_wins_over_body() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .oneshot(post_form("/tex2svg?tex=q", "tex=b"))
        .await
        .unwrap();
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("q").as_slice());
}

#[tokio::test]
async fn test_missing_expression_is_bad_request() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .clone()
        .oneshot(post_form("/tex2svg", "math=x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router.oneshot(get("/tex2svg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "missing_expression");

    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let body = format!("tex=x&pad={}", "a".repeat(8192));
    let response = router.oneshot(post_form("/tex2svg", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.renderer.calls(), 0);
}

// =============================================================================
// Path Shape
// =============================================================================

#[tokio::test]
async fn test_path_style_vector() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("/x%5E2.svg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("text/xml"));
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("x^2").as_slice());
}

#[tokio::test]
async fn test_path_style_restores_backslashes() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("//frac%7B1%7D%7B2%7D.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("image/png"));
    assert!(harness
        .artifact_path("\\frac{1}{2}", VariantKind::RawVector)
        .exists());
}

#[tokio::test]
async fn test_path_style_shares_cache_with_query() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    router
        .clone()
        .oneshot(get("/tex2svg?tex=y%5E3"))
        .await
        .unwrap();
    let response = router.oneshot(get("/y%5E3.svg")).await.unwrap();
    assert_eq!(header(&response, "x-artifact-cache"), Some("hit"));
    assert_eq!(harness.renderer.calls(), 1);
}

#[tokio::test]
async fn test_undecodable_path_is_not_found() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("/%FF%FE.svg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.renderer.calls(), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_rejected_expression_writes_nothing() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let uri = format!(
        "/tex2png?tex={}",
        urlencoding::encode(&format!("{}{{x}}", REJECTED_MARKER))
    );
    let response = router.oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "render_failed");
    // The renderer's message is not leaked
    assert!(!json["message"]
        .as_str()
        .unwrap()
        .contains("Undefined control sequence"));

    assert_eq!(harness.cached_file_count(), 0);
    assert_eq!(harness.rasterizer.calls(), 0);
}

#[tokio::test]
async fn test_put_is_not_allowed() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let request = axum::http::Request::builder()
        .method("PUT")
        .uri("/index.html")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_response_headers() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("/tex2svg?tex=z")).await.unwrap();
    assert_eq!(header(&response, "cache-control"), Some("public, max-age=120"));
    assert_eq!(header(&response, "vary"), Some("accept-encoding"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
