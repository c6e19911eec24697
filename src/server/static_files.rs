//! Static file serving from the web root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use axum::http::HeaderValue;
use axum::response::Response;
use bytes::Bytes;
use tracing::warn;

use crate::encoding::AcceptEncoding;
use crate::error::RequestError;

use super::handlers::{payload_response, AppState};

/// File served when a directory is requested.
pub const INDEX_FILE: &str = "index.html";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Serve `path` from the web root with negotiated compression.
pub async fn serve_static(
    state: &AppState,
    path: &str,
    accept: AcceptEncoding,
) -> Result<Response, RequestError> {
    let relative = resolve_path(path)?;
    let mut file = state.web_root.join(relative);

    if tokio::fs::metadata(&file)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
    {
        file.push(INDEX_FILE);
    }

    let data = match tokio::fs::read(&file).await {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %file.display(), "Failed to read static file: {}", e);
            }
            return Err(RequestError::NotFound {
                path: path.to_string(),
            });
        }
    };

    let content_type = content_type_for(&file, &data);
    let selection = state
        .negotiator
        .select_static(data, content_type, accept)
        .await;

    Ok(payload_response(
        HeaderValue::from_static(content_type),
        selection,
        state.cache_max_age,
    ))
}

/// Turn a URL path into a path relative to the web root.
///
/// Rejects anything that is not a plain sequence of names, so a request can
/// never leave the web root.
fn resolve_path(path: &str) -> Result<PathBuf, RequestError> {
    let invalid = || RequestError::InvalidPath {
        path: path.to_string(),
    };

    let decoded = urlencoding::decode(path).map_err(|_| invalid())?;
    let trimmed = decoded.trim_start_matches('/');

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(name) => relative.push(name),
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }
    Ok(relative)
}

/// Pick a content type from the extension, then from image magic bytes.
pub fn content_type_for(path: &Path, data: &[u8]) -> &'static str {
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| content_type_for_extension(&ext.to_ascii_lowercase()));

    by_extension
        .or_else(|| image::guess_format(data).ok().map(|format| format.to_mime_type()))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let content_type = match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "text/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => return None,
    };
    Some(content_type)
}
