//! HTTP request handlers for the texserve API.
//!
//! # Endpoints
//!
//! - `GET|POST /tex2svg`, `GET|POST /tex2png` - Render an expression
//! - `GET /{expression}.svg`, `GET /{expression}.png` - Path-style render
//! - `GET /health` - Health check endpoint
//! - anything else - Static files from the web root

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::artifact::OutputKind;
use crate::encoding::{AcceptEncoding, CompressionNegotiator, Selection};
use crate::error::{RequestError, StageError};
use crate::pipeline::{PendingRequest, RenderPipeline, Stage};

use super::request::{expression_from_path, tex_param};
use super::static_files::serve_static;

/// Reports whether a rendition came straight from the artifact cache.
pub const ARTIFACT_CACHE_HEADER: HeaderName = HeaderName::from_static("x-artifact-cache");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Produces raw artifacts
    pub pipeline: Arc<RenderPipeline>,

    /// Chooses the encoding of every response body
    pub negotiator: Arc<CompressionNegotiator>,

    /// Directory served for non-render paths
    pub web_root: Arc<PathBuf>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Largest request body read when looking for `tex=`
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        pipeline: RenderPipeline,
        negotiator: CompressionNegotiator,
        web_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            negotiator: Arc::new(negotiator),
            web_root: Arc::new(web_root.into()),
            cache_max_age: 86400,
            max_body_bytes: 64 * 1024,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "render_failed")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert RequestError to HTTP response.
///
/// 404s are logged at DEBUG, other client errors at WARN. Render failures
/// and timeouts share one response that carries no renderer detail.
impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            RequestError::MissingExpression => (StatusCode::BAD_REQUEST, "missing_expression"),
            RequestError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            RequestError::InvalidPath { .. } => (StatusCode::BAD_REQUEST, "invalid_path"),
            RequestError::MethodNotAllowed { .. } => {
                (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed")
            }
            RequestError::Unavailable => (StatusCode::UNPROCESSABLE_ENTITY, "render_failed"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(error_type, status = status.as_u16(), "Server error: {}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(error_type, status = status.as_u16(), "Resource not found: {}", message);
        } else {
            warn!(error_type, status = status.as_u16(), "Client error: {}", message);
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle `/tex2svg` and `/tex2png`.
///
/// A `tex=` query parameter wins. Otherwise the request body is read (under
/// the stage deadline and the body size cap) and searched for `tex=`.
///
/// # Responses
///
/// - `200 OK` with the rendition, possibly compressed
/// - `400 Bad Request` when no expression could be found
/// - `422 Unprocessable Entity` when rendering failed or timed out
pub async fn tex_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, RequestError> {
    let kind = OutputKind::from_endpoint(uri.path()).ok_or_else(|| RequestError::NotFound {
        path: uri.path().to_string(),
    })?;

    let expression = match uri.query().and_then(tex_param) {
        Some(expression) => expression,
        None => read_body_expression(&state, body)
            .await
            .ok_or(RequestError::MissingExpression)?,
    };

    let request = PendingRequest::new(expression, kind).with_accept(AcceptEncoding::from_headers(&headers));
    render_response(&state, &request).await
}

/// Handle everything not matched by a route: path-style renders for
/// `.svg` / `.png` paths, static files otherwise.
pub async fn fallback_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, RequestError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(RequestError::MethodNotAllowed {
            method: method.to_string(),
        });
    }

    let path = uri.path();
    let accept = AcceptEncoding::from_headers(&headers);

    if OutputKind::from_suffix(path).is_some() {
        let (expression, kind) =
            expression_from_path(path).ok_or_else(|| RequestError::NotFound {
                path: path.to_string(),
            })?;
        let request = PendingRequest::new(expression, kind).with_accept(accept);
        return render_response(&state, &request).await;
    }

    serve_static(&state, path, accept).await
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Helpers
// =============================================================================

async fn read_body_expression(state: &AppState, body: Body) -> Option<String> {
    let limit = state.max_body_bytes;
    let stage = async move {
        axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| StageError::Body {
                message: e.to_string(),
            })
    };

    let bytes = state.pipeline.supervisor().run(Stage::ReadBody, stage).await?;
    tex_param(&String::from_utf8_lossy(&bytes))
}

async fn render_response(
    state: &AppState,
    request: &PendingRequest,
) -> Result<Response, RequestError> {
    let rendition = state
        .pipeline
        .obtain(request)
        .await
        .ok_or(RequestError::Unavailable)?;

    let selection = state
        .negotiator
        .select(
            rendition.data,
            request.kind,
            request.accept,
            Some(&rendition.key),
        )
        .await;

    let mut response = payload_response(
        HeaderValue::from_static(request.kind.content_type()),
        selection,
        state.cache_max_age,
    );
    response.headers_mut().insert(
        ARTIFACT_CACHE_HEADER,
        HeaderValue::from_static(if rendition.cache_hit { "hit" } else { "miss" }),
    );
    Ok(response)
}

/// Build a `200 OK` response carrying a negotiated payload.
pub(crate) fn payload_response(
    content_type: HeaderValue,
    selection: Selection,
    cache_max_age: u32,
) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", cache_max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Some(encoding) = selection.encoding {
        headers.insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static(encoding.label()),
        );
    }

    (StatusCode::OK, headers, Body::from(selection.payload)).into_response()
}

// =============================================================================
// Tests
// =============================================================================
