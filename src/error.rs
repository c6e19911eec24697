use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::Encoding;

/// Errors raised by an artifact store tier.
///
/// Store failures never fail a request: the freshly produced bytes are still
/// served, the failure is only logged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing a blob to disk failed
    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a blob from disk failed for a reason other than absence
    #[error("Failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by a single bounded pipeline stage.
///
/// All of these collapse to "no artifact available" at the pipeline
/// boundary; the detail is only ever logged.
#[derive(Debug, Error)]
pub enum StageError {
    /// The TeX renderer rejected the expression or could not be run
    #[error("Render failed: {message}")]
    Render { message: String },

    /// The rasterizer could not turn vector markup into a bitmap
    #[error("Rasterize failed: {message}")]
    Rasterize { message: String },

    /// A compressor failed
    #[error("{encoding} compression failed: {message}")]
    Compress { encoding: Encoding, message: String },

    /// The request body could not be read
    #[error("Failed to read request body: {message}")]
    Body { message: String },
}

impl StageError {
    pub fn render(message: impl Into<String>) -> Self {
        StageError::Render {
            message: message.into(),
        }
    }

    pub fn rasterize(message: impl Into<String>) -> Self {
        StageError::Rasterize {
            message: message.into(),
        }
    }
}

/// Errors surfaced to HTTP clients.
///
/// Messages are deliberately generic: no renderer output or file system
/// detail reaches the client.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The request had a recognised shape but carried no `tex=` expression
    #[error("No expression in request")]
    MissingExpression,

    /// Static file or path-style expression not found
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Path escapes the web root or is otherwise malformed
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    /// Method not supported on this resource
    #[error("Method not allowed: {method}")]
    MethodNotAllowed { method: String },

    /// Rendering failed or timed out
    #[error("Expression could not be rendered")]
    Unavailable,
}
