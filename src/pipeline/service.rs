//! Render pipeline orchestration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RenderPipeline                        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                       obtain()                         │  │
//! │  │  1. Derive key         4. Render (bounded), cache      │  │
//! │  │  2. Bitmap cached?     5. Rasterize (bounded), cache   │  │
//! │  │  3. Vector cached?     6. Return                       │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │        │                 │                    │              │
//! │        ▼                 ▼                    ▼              │
//! │  ┌───────────┐   ┌───────────────┐   ┌──────────────────┐   │
//! │  │ KeyDeriver│   │ ArtifactCache │   │Renderer/Rasterizer│  │
//! │  └───────────┘   └───────────────┘   └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::artifact::{
    ArtifactCache, CacheKey, DefaultKeyDeriver, KeyDeriver, OutputKind, VariantKind,
};
use crate::encoding::AcceptEncoding;
use crate::error::StageError;

use super::inflight::InFlight;
use super::raster::Rasterizer;
use super::render::Renderer;
use super::supervisor::{Stage, TimeoutSupervisor};

// =============================================================================
// Pending Request
// =============================================================================

/// Everything the pipeline needs to know about one request.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// The TeX source, passed to the renderer verbatim
    pub expression: String,

    /// Vector or bitmap output
    pub kind: OutputKind,

    /// Codings the client accepts
    pub accept: AcceptEncoding,

    /// Per-stage deadline, overriding the pipeline's supervisor
    pub deadline: Option<Duration>,
}

impl PendingRequest {
    pub fn new(expression: impl Into<String>, kind: OutputKind) -> Self {
        Self {
            expression: expression.into(),
            kind,
            accept: AcceptEncoding::identity(),
            deadline: None,
        }
    }

    pub fn with_accept(mut self, accept: AcceptEncoding) -> Self {
        self.accept = accept;
        self
    }

    /// Bound each stage of this request by `deadline` instead of the
    /// pipeline default.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

// =============================================================================
// Rendition
// =============================================================================

/// The raw artifact produced for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    /// Raw vector or bitmap bytes
    pub data: Bytes,

    /// Address of the artifact and its compressed variants
    pub key: CacheKey,

    /// Whether no stage had to run
    pub cache_hit: bool,
}

// =============================================================================
// Render Pipeline
// =============================================================================

/// Produces vector and bitmap artifacts, reusing cached ones.
///
/// Every stage that leaves the process (rendering, rasterizing) runs under
/// the [`TimeoutSupervisor`]. The cache write that follows a stage is part of
/// that stage, so a detached stage that completes late still populates the
/// cache.
///
/// Render failures and timeouts look the same to callers: `None`.
pub struct RenderPipeline {
    deriver: Arc<dyn KeyDeriver>,
    cache: Arc<ArtifactCache>,
    renderer: Arc<dyn Renderer>,
    rasterizer: Arc<dyn Rasterizer>,
    supervisor: TimeoutSupervisor,
    inflight: Option<InFlight<(CacheKey, OutputKind), Option<Rendition>>>,
}

impl RenderPipeline {
    /// Create a pipeline with SHA-256 keys and no request coalescing.
    pub fn new(
        cache: Arc<ArtifactCache>,
        renderer: Arc<dyn Renderer>,
        rasterizer: Arc<dyn Rasterizer>,
        supervisor: TimeoutSupervisor,
    ) -> Self {
        Self {
            deriver: Arc::new(DefaultKeyDeriver::default()),
            cache,
            renderer,
            rasterizer,
            supervisor,
            inflight: None,
        }
    }

    /// Use a different key derivation strategy.
    pub fn with_key_deriver(mut self, deriver: Arc<dyn KeyDeriver>) -> Self {
        self.deriver = deriver;
        self
    }

    /// Let concurrent requests for the same artifact share one production.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(InFlight::new);
        self
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    pub fn supervisor(&self) -> TimeoutSupervisor {
        self.supervisor
    }

    /// Derive the cache key of an expression.
    pub fn key_for(&self, expression: &str) -> CacheKey {
        self.deriver.derive(expression.as_bytes())
    }

    /// The supervisor bounding the stages of `request`.
    pub fn supervisor_for(&self, request: &PendingRequest) -> TimeoutSupervisor {
        match request.deadline {
            Some(deadline) => TimeoutSupervisor::new(deadline).with_policy(self.supervisor.policy()),
            None => self.supervisor,
        }
    }

    /// Obtain the raw artifact for a request.
    ///
    /// Returns `None` when rendering or rasterizing failed or timed out.
    pub async fn obtain(&self, request: &PendingRequest) -> Option<Rendition> {
        let key = self.key_for(&request.expression);
        let supervisor = self.supervisor_for(request);

        match &self.inflight {
            Some(inflight) => {
                inflight
                    .run((key.clone(), request.kind), || {
                        self.produce(supervisor, key, &request.expression, request.kind)
                    })
                    .await
            }
            None => {
                self.produce(supervisor, key, &request.expression, request.kind)
                    .await
            }
        }
    }

    async fn produce(
        &self,
        supervisor: TimeoutSupervisor,
        key: CacheKey,
        expression: &str,
        kind: OutputKind,
    ) -> Option<Rendition> {
        if kind == OutputKind::Bitmap {
            if let Some(data) = self.cache.read(&key, VariantKind::RawBitmap).await {
                return Some(Rendition {
                    data,
                    key,
                    cache_hit: true,
                });
            }
        }

        let (vector, vector_cached) = match self.cache.read(&key, VariantKind::RawVector).await {
            Some(vector) => (vector, true),
            None => (self.render(supervisor, &key, expression).await?, false),
        };

        match kind {
            OutputKind::Vector => Some(Rendition {
                data: vector,
                key,
                cache_hit: vector_cached,
            }),
            OutputKind::Bitmap => {
                let bitmap = self.rasterize(supervisor, &key, vector).await?;
                Some(Rendition {
                    data: bitmap,
                    key,
                    cache_hit: false,
                })
            }
        }
    }

    async fn render(
        &self,
        supervisor: TimeoutSupervisor,
        key: &CacheKey,
        expression: &str,
    ) -> Option<Bytes> {
        debug!(key = %key, "Rendering expression");

        let renderer = Arc::clone(&self.renderer);
        let cache = Arc::clone(&self.cache);
        let key = key.clone();
        let expression = expression.to_owned();

        let stage = async move {
            let vector = renderer.render(&expression).await?;
            cache.store(&key, VariantKind::RawVector, vector.clone()).await;
            Ok::<_, StageError>(vector)
        };

        supervisor.run(Stage::Render, stage).await
    }

    async fn rasterize(
        &self,
        supervisor: TimeoutSupervisor,
        key: &CacheKey,
        vector: Bytes,
    ) -> Option<Bytes> {
        debug!(key = %key, "Rasterizing vector");

        let rasterizer = Arc::clone(&self.rasterizer);
        let cache = Arc::clone(&self.cache);
        let key = key.clone();

        let stage = async move {
            let bitmap = rasterizer.rasterize(vector).await?;
            cache.store(&key, VariantKind::RawBitmap, bitmap.clone()).await;
            Ok::<_, StageError>(bitmap)
        };

        supervisor.run(Stage::Rasterize, stage).await
    }
}

// =============================================================================
// Tests
// =============================================================================
