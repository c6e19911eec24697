//! Selection of the representation sent to the client.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::{compress, is_precompressed_media, AcceptEncoding, Encoding};
use crate::artifact::{ArtifactCache, CacheKey, OutputKind, VariantKind};
use crate::error::StageError;
use crate::pipeline::{Stage, TimeoutSupervisor};

/// Process-level compression switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationPolicy {
    /// Master switch; when off every response is identity-encoded
    pub enabled: bool,

    /// Offer brotli when the client accepts it
    pub brotli: bool,

    /// Also compress rasterized bitmaps
    pub compress_bitmaps: bool,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            brotli: true,
            compress_bitmaps: false,
        }
    }
}

/// The payload chosen for a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub payload: Bytes,

    /// `None` means identity; no `Content-Encoding` header is sent
    pub encoding: Option<Encoding>,
}

impl Selection {
    pub fn identity(payload: Bytes) -> Self {
        Self {
            payload,
            encoding: None,
        }
    }
}

/// Picks between the raw payload and its compressed variants.
///
/// Candidates are tried in [`Encoding::PRIORITY`] order. Each one is read
/// from the artifact cache or compressed under the stage deadline (and
/// written back). A candidate is used only when it is strictly shorter than
/// the raw payload; when none qualifies the raw bytes are sent as-is.
pub struct CompressionNegotiator {
    cache: Arc<ArtifactCache>,
    supervisor: TimeoutSupervisor,
    policy: NegotiationPolicy,
}

impl CompressionNegotiator {
    pub fn new(
        cache: Arc<ArtifactCache>,
        supervisor: TimeoutSupervisor,
        policy: NegotiationPolicy,
    ) -> Self {
        Self {
            cache,
            supervisor,
            policy,
        }
    }

    pub fn policy(&self) -> NegotiationPolicy {
        self.policy
    }

    /// Whether output of this kind is ever compressed.
    pub fn applies_to(&self, kind: OutputKind) -> bool {
        self.policy.enabled && (kind == OutputKind::Vector || self.policy.compress_bitmaps)
    }

    fn candidates(&self, accepted: AcceptEncoding) -> impl Iterator<Item = Encoding> + '_ {
        Encoding::PRIORITY.into_iter().filter(move |&encoding| {
            accepted.accepts(encoding) && (encoding != Encoding::Brotli || self.policy.brotli)
        })
    }

    /// Choose the payload for a rendered artifact.
    ///
    /// `key` addresses the artifact's compressed variants in the cache.
    pub async fn select(
        &self,
        raw: Bytes,
        kind: OutputKind,
        accepted: AcceptEncoding,
        key: Option<&CacheKey>,
    ) -> Selection {
        if !self.applies_to(kind) || !accepted.any() {
            return Selection::identity(raw);
        }

        for encoding in self.candidates(accepted) {
            let variant = VariantKind::Compressed {
                encoding,
                base: kind,
            };

            let cached = match key {
                Some(key) => self.cache.read(key, variant).await,
                None => None,
            };

            let payload = match cached {
                Some(payload) => payload,
                None => {
                    let target = key.map(|key| (key.clone(), variant));
                    match self.compress_bounded(raw.clone(), encoding, target).await {
                        Some(payload) => payload,
                        None => continue,
                    }
                }
            };

            if payload.len() < raw.len() {
                debug!(
                    encoding = %encoding,
                    original = raw.len(),
                    compressed = payload.len(),
                    "Selected compressed representation"
                );
                return Selection {
                    payload,
                    encoding: Some(encoding),
                };
            }
        }

        Selection::identity(raw)
    }

    /// Choose the payload for a static file. Nothing is cached.
    pub async fn select_static(
        &self,
        raw: Bytes,
        mime_type: &str,
        accepted: AcceptEncoding,
    ) -> Selection {
        if !self.policy.enabled || !accepted.any() || is_precompressed_media(mime_type) {
            return Selection::identity(raw);
        }

        for encoding in self.candidates(accepted) {
            if let Some(payload) = self.compress_bounded(raw.clone(), encoding, None).await {
                if payload.len() < raw.len() {
                    return Selection {
                        payload,
                        encoding: Some(encoding),
                    };
                }
            }
        }

        Selection::identity(raw)
    }

    /// Compress on the blocking pool under the stage deadline.
    ///
    /// The cache write-back is part of the stage, so under a detaching
    /// supervisor a late compression still lands in the cache.
    async fn compress_bounded(
        &self,
        raw: Bytes,
        encoding: Encoding,
        target: Option<(CacheKey, VariantKind)>,
    ) -> Option<Bytes> {
        let cache = Arc::clone(&self.cache);

        let stage = async move {
            let output = tokio::task::spawn_blocking(move || compress(&raw, encoding))
                .await
                .map_err(|e| StageError::Compress {
                    encoding,
                    message: e.to_string(),
                })?
                .map_err(|e| StageError::Compress {
                    encoding,
                    message: e.to_string(),
                })?;
            let output = Bytes::from(output);

            if let Some((key, variant)) = target {
                cache.store(&key, variant, output.clone()).await;
            }

            Ok::<_, StageError>(output)
        };

        self.supervisor.run(Stage::Compress(encoding), stage).await
    }
}

// =============================================================================
// Tests
// =============================================================================
