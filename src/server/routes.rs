//! Router configuration for texserve.
//!
//! # Route Structure
//!
//! ```text
//! /health                 - Health check
//! /tex2svg, /tex2png      - Render from ?tex= or a tex= body (GET, POST)
//! /{expression}.svg|.png  - Path-style render (fallback)
//! /*                      - Static files (fallback)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use texserve::server::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new("./www").with_cache_max_age(3600);
//! let router = create_router(pipeline, negotiator, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:2082").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{ACCEPT_ENCODING, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{fallback_handler, health_handler, tex_handler, AppState};
use crate::encoding::CompressionNegotiator;
use crate::pipeline::RenderPipeline;

/// Default Cache-Control max-age (1 day).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 86400;

/// Default cap on request bodies searched for `tex=`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Directory served for non-render paths
    pub web_root: PathBuf,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Largest request body read when looking for `tex=`
    pub max_body_bytes: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration serving static files from `web_root`.
    ///
    /// By default CORS allows any origin, responses may be cached for a day,
    /// bodies are capped at 64 KiB and tracing is enabled.
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: web_root.into(),
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Set the request body cap in bytes.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router(
    pipeline: RenderPipeline,
    negotiator: CompressionNegotiator,
    config: RouterConfig,
) -> Router {
    let mut app_state = AppState::new(pipeline, negotiator, config.web_root.clone());
    app_state.cache_max_age = config.cache_max_age;
    app_state.max_body_bytes = config.max_body_bytes;

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/tex2svg", get(tex_handler).post(tex_handler))
        .route("/tex2png", get(tex_handler).post(tex_handler))
        .fallback(fallback_handler)
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT_ENCODING])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
