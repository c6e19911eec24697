//! Artifact cache and timeout integration tests.
//!
//! Tests verify:
//! - Disabled cache kinds are never read or written
//! - Timeouts bound response latency
//! - Detached stages still populate the cache after their deadline
//! - The memory tier in front of the disk tier

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use tower::ServiceExt;

use texserve::{CachePolicy, CancelPolicy, Encoding, NegotiationPolicy, OutputKind, VariantKind};

use super::test_utils::{
    body_bytes, get, get_with_encoding, header, mock_svg, MockRenderer, TestHarness,
};

// =============================================================================
// Cache Toggles
// =============================================================================

#[tokio::test]
async fn test_disabled_vector_cache_always_renders() {
    let harness = TestHarness::new().with_cache_policy(CachePolicy {
        vector: false,
        ..CachePolicy::all()
    });
    let router = harness.router().await;

    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(get("/tex2svg?tex=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-artifact-cache"), Some("miss"));
    }

    assert_eq!(harness.renderer.calls(), 3);
    assert!(!harness.artifact_path("x", VariantKind::RawVector).exists());
}

#[tokio::test]
async fn test_disabled_kind_ignores_existing_file() {
    let harness = TestHarness::new().with_cache_policy(CachePolicy {
        vector: false,
        ..CachePolicy::all()
    });
    let stale = harness.artifact_path("x", VariantKind::RawVector);
    std::fs::write(&stale, b"<svg>stale</svg>").unwrap();

    let response = harness
        .router()
        .await
        .oneshot(get("/tex2svg?tex=x"))
        .await
        .unwrap();
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("x").as_slice());
    assert_eq!(harness.renderer.calls(), 1);
}

#[tokio::test]
async fn test_disabled_bitmap_cache_keeps_vector() {
    let harness = TestHarness::new().with_cache_policy(CachePolicy {
        bitmap: false,
        ..CachePolicy::all()
    });
    let router = harness.router().await;

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(get("/tex2png?tex=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(harness.renderer.calls(), 1);
    assert_eq!(harness.rasterizer.calls(), 2);
    assert!(harness.artifact_path("x", VariantKind::RawVector).exists());
    assert!(!harness.artifact_path("x", VariantKind::RawBitmap).exists());
}

#[tokio::test]
async fn test_disabled_gzip_cache_still_compresses() {
    let harness = TestHarness::new().with_cache_policy(CachePolicy {
        gzip: false,
        ..CachePolicy::all()
    });
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "gzip"))
        .await
        .unwrap();
    assert_eq!(header(&response, "content-encoding"), Some("gzip"));

    let gzip = VariantKind::Compressed {
        encoding: Encoding::Gzip,
        base: OutputKind::Vector,
    };
    assert!(!harness.artifact_path("x", gzip).exists());
    assert!(harness.artifact_path("x", VariantKind::RawVector).exists());
}

#[tokio::test]
async fn test_everything_disabled_writes_nothing() {
    let harness = TestHarness::new().with_cache_policy(CachePolicy::none());
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "gzip, deflate, br"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.cached_file_count(), 0);
}

// =============================================================================
// Timeouts
// =============================================================================

#[tokio::test]
async fn test_slow_render_times_out() {
    let harness = TestHarness::new()
        .with_renderer(MockRenderer::slow(Duration::from_secs(30)))
        .with_timeout(Duration::from_millis(100), CancelPolicy::Abort);
    let router = harness.router().await;

    let started = Instant::now();
    let response = router.oneshot(get("/tex2svg?tex=slow")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(harness.cached_file_count(), 0);
}

#[tokio::test]
async fn test_detached_render_lands_in_cache_later() {
    let harness = TestHarness::new()
        .with_renderer(MockRenderer::slow(Duration::from_millis(200)))
        .with_timeout(Duration::from_millis(50), CancelPolicy::Detach);
    let router = harness.router().await;

    let response = router
        .clone()
        .oneshot(get("/tex2svg?tex=late"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(harness.artifact_path("late", VariantKind::RawVector).exists());

    let response = router.oneshot(get("/tex2svg?tex=late")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-artifact-cache"), Some("hit"));
    assert_eq!(harness.renderer.calls(), 1);
}

#[tokio::test]
async fn test_aborted_render_never_lands_in_cache() {
    let harness = TestHarness::new()
        .with_renderer(MockRenderer::slow(Duration::from_millis(200)))
        .with_timeout(Duration::from_millis(50), CancelPolicy::Abort);
    let router = harness.router().await;

    let response = router.oneshot(get("/tex2svg?tex=late")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!harness.artifact_path("late", VariantKind::RawVector).exists());
}

// =============================================================================
// Tiers
// =============================================================================

#[tokio::test]
async fn test_memory_tier_writes_through_to_disk() {
    let harness = TestHarness::new()
        .with_memory_tier()
        .with_negotiation(NegotiationPolicy {
            enabled: false,
            ..NegotiationPolicy::default()
        });
    let router = harness.router().await;

    router
        .clone()
        .oneshot(get("/tex2svg?tex=m"))
        .await
        .unwrap();
    assert!(harness.artifact_path("m", VariantKind::RawVector).exists());

    // Served from memory even once the disk copy is gone
    std::fs::remove_file(harness.artifact_path("m", VariantKind::RawVector)).unwrap();
    let response = router.oneshot(get("/tex2svg?tex=m")).await.unwrap();
    assert_eq!(header(&response, "x-artifact-cache"), Some("hit"));
    assert_eq!(harness.renderer.calls(), 1);
}
