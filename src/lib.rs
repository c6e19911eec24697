//! # texserve
//!
//! A TeX rendering server with a tiered, content-addressed artifact cache and
//! HTTP compression negotiation.
//!
//! For every expression the server produces (and reuses) a vector rendition,
//! optionally rasterizes it to PNG, and serves whichever precompressed
//! variant the client accepts, with every stage bounded by a deadline.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`artifact`] - Cache keys, variant kinds and the tiered artifact store
//! - [`pipeline`] - Timeout supervision, renderer and rasterizer, render pipeline
//! - [`encoding`] - `Accept-Encoding` parsing, codecs and compression negotiation
//! - [`server`] - Axum-based HTTP handlers, request parsing and static files
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use texserve::{
//!     create_router, ArtifactCache, ArtifactStore, CachePolicy, CommandRenderer,
//!     CompressionNegotiator, MemoryStore, NegotiationPolicy, RenderPipeline, RouterConfig,
//!     SvgRasterizer, TimeoutSupervisor,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let tiers: Vec<Arc<dyn ArtifactStore>> = vec![Arc::new(MemoryStore::new())];
//!     let cache = Arc::new(ArtifactCache::new(CachePolicy::all(), tiers));
//!     let supervisor = TimeoutSupervisor::new(Duration::from_secs(5));
//!
//!     let pipeline = RenderPipeline::new(
//!         Arc::clone(&cache),
//!         Arc::new(CommandRenderer::new("tex2svg", ["{tex}"])),
//!         Arc::new(SvgRasterizer::new()),
//!         supervisor,
//!     );
//!     let negotiator =
//!         CompressionNegotiator::new(cache, supervisor, NegotiationPolicy::default());
//!
//!     let router = create_router(pipeline, negotiator, RouterConfig::new("./www"));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:2082").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod encoding;
pub mod error;
pub mod pipeline;
pub mod server;

// Re-export commonly used types
pub use artifact::{
    ArtifactCache, ArtifactStore, CacheKey, CachePolicy, DefaultKeyDeriver, DigestKeyDeriver,
    DiskStore, KeyDeriver, MemoryStore, OutputKind, VariantKind,
};
pub use config::{Config, Settings};
pub use encoding::{AcceptEncoding, CompressionNegotiator, Encoding, NegotiationPolicy, Selection};
pub use error::{RequestError, StageError, StoreError};
pub use pipeline::{
    CancelPolicy, CommandRenderer, PendingRequest, Rasterizer, RenderPipeline, Rendition,
    Renderer, SvgRasterizer, TimeoutSupervisor,
};
pub use server::{create_router, AppState, RouterConfig};
