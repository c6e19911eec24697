//! Compression negotiation integration tests.
//!
//! Tests verify:
//! - Priority order brotli > gzip > deflate
//! - Compressed variants are cached next to the raw artifact
//! - A compressed payload is only sent when it is smaller

use axum::http::StatusCode;
use tower::ServiceExt;

use texserve::{Encoding, NegotiationPolicy, OutputKind, VariantKind};

use super::test_utils::{
    body_bytes, get_with_encoding, gunzip, header, inflate, mock_svg, unbrotli, TestHarness,
};

fn compressed(encoding: Encoding, base: OutputKind) -> VariantKind {
    VariantKind::Compressed { encoding, base }
}

#[tokio::test]
async fn test_brotli_preferred() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "gzip, deflate, br"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-encoding"), Some("br"));

    let body = body_bytes(response).await;
    assert_eq!(unbrotli(&body), mock_svg("x"));
    assert!(harness
        .artifact_path("x", compressed(Encoding::Brotli, OutputKind::Vector))
        .exists());
}

#[tokio::test]
async fn test_brotli_disabled_uses_gzip() {
    let harness = TestHarness::new().with_negotiation(NegotiationPolicy {
        brotli: false,
        ..NegotiationPolicy::default()
    });
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "br, gzip, deflate"))
        .await
        .unwrap();
    assert_eq!(header(&response, "content-encoding"), Some("gzip"));
    let body = body_bytes(response).await;
    assert_eq!(gunzip(&body), mock_svg("x"));
}

#[tokio::test]
async fn test_deflate_only_client() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "deflate"))
        .await
        .unwrap();
    assert_eq!(header(&response, "content-encoding"), Some("deflate"));
    let body = body_bytes(response).await;
    assert_eq!(inflate(&body), mock_svg("x"));
    assert!(harness
        .artifact_path("x", compressed(Encoding::Deflate, OutputKind::Vector))
        .exists());
}

#[tokio::test]
async fn test_refused_coding_is_skipped() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "br;q=0, gzip"))
        .await
        .unwrap();
    assert_eq!(header(&response, "content-encoding"), Some("gzip"));
}

#[tokio::test]
async fn test_identity_client_gets_raw_bytes() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "identity"))
        .await
        .unwrap();
    assert!(header(&response, "content-encoding").is_none());
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("x").as_slice());
}

#[tokio::test]
async fn test_cached_variant_reused_without_render() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    let first = router
        .clone()
        .oneshot(get_with_encoding("/tex2svg?tex=x", "gzip"))
        .await
        .unwrap();
    let first_body = body_bytes(first).await;

    let second = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "gzip"))
        .await
        .unwrap();
    assert_eq!(header(&second, "content-encoding"), Some("gzip"));
    let second_body = body_bytes(second).await;

    assert_eq!(first_body, second_body);
    assert_eq!(harness.renderer.calls(), 1);

    let cached = std::fs::read(
        harness.artifact_path("x", compressed(Encoding::Gzip, OutputKind::Vector)),
    )
    .unwrap();
    assert_eq!(cached, first_body.to_vec());
}

#[tokio::test]
async fn test_bitmap_gzip_variant() {
    let harness = TestHarness::new().with_negotiation(NegotiationPolicy {
        compress_bitmaps: true,
        ..NegotiationPolicy::default()
    });
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2png?tex=x%5E2", "gzip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("image/png"));

    let raw = std::fs::read(harness.artifact_path("x^2", VariantKind::RawBitmap)).unwrap();
    let gzip = std::fs::read(
        harness.artifact_path("x^2", compressed(Encoding::Gzip, OutputKind::Bitmap)),
    )
    .unwrap();

    let encoding = header(&response, "content-encoding").map(str::to_string);
    let body = body_bytes(response).await;
    if gzip.len() < raw.len() {
        assert_eq!(encoding.as_deref(), Some("gzip"));
        assert_eq!(gunzip(&body), raw);
    } else {
        assert!(encoding.is_none());
        assert_eq!(body.to_vec(), raw);
    }
}

#[tokio::test]
async fn test_oversized_cached_variant_falls_back_to_raw() {
    let harness = TestHarness::new();
    let router = harness.router().await;

    // Plant an unhelpfully large gzip variant
    let raw_len = mock_svg("x").len();
    std::fs::write(
        harness.artifact_path("x", compressed(Encoding::Gzip, OutputKind::Vector)),
        vec![0u8; raw_len + 1],
    )
    .unwrap();

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "gzip"))
        .await
        .unwrap();
    assert!(header(&response, "content-encoding").is_none());
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), mock_svg("x").as_slice());
}

#[tokio::test]
async fn test_compression_switched_off() {
    let harness = TestHarness::new().with_negotiation(NegotiationPolicy {
        enabled: false,
        ..NegotiationPolicy::default()
    });
    let router = harness.router().await;

    let response = router
        .oneshot(get_with_encoding("/tex2svg?tex=x", "gzip, deflate, br"))
        .await
        .unwrap();
    assert!(header(&response, "content-encoding").is_none());
    assert_eq!(harness.cached_file_count(), 1);
}
