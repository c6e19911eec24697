//! Artifact store trait and the tiered cache built on top of it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::variant::VariantKind;
use crate::encoding::Encoding;
use crate::error::StoreError;

// =============================================================================
// Store Trait
// =============================================================================

/// A backing store for immutable artifacts.
///
/// Blobs are addressed by `(key, kind)` and never mutated once written.
/// Concurrent writers of the same address always carry identical bytes, so
/// implementations need not serialize them, but a reader must never observe
/// a partially written blob.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether a blob exists for this address.
    async fn exists(&self, key: &CacheKey, kind: VariantKind) -> bool;

    /// Read a blob, `None` when absent.
    async fn read(&self, key: &CacheKey, kind: VariantKind) -> Result<Option<Bytes>, StoreError>;

    /// Persist a blob.
    async fn write(&self, key: &CacheKey, kind: VariantKind, data: Bytes) -> Result<(), StoreError>;

    /// Tier name for logging.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Cache Policy
// =============================================================================

/// Which variant kinds may be cached.
///
/// The three compression toggles apply to compressed variants of both
/// vector and bitmap artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub vector: bool,
    pub bitmap: bool,
    pub gzip: bool,
    pub deflate: bool,
    pub brotli: bool,
}

impl CachePolicy {
    /// Every kind enabled.
    pub fn all() -> Self {
        Self {
            vector: true,
            bitmap: true,
            gzip: true,
            deflate: true,
            brotli: true,
        }
    }

    /// Every kind disabled.
    pub fn none() -> Self {
        Self {
            vector: false,
            bitmap: false,
            gzip: false,
            deflate: false,
            brotli: false,
        }
    }

    /// Whether `kind` may be read from or written to the store.
    pub fn allows(&self, kind: VariantKind) -> bool {
        match kind {
            VariantKind::RawVector => self.vector,
            VariantKind::RawBitmap => self.bitmap,
            VariantKind::Compressed { encoding, .. } => match encoding {
                Encoding::Gzip => self.gzip,
                Encoding::Deflate => self.deflate,
                Encoding::Brotli => self.brotli,
            },
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::all()
    }
}

// =============================================================================
// Tiered Artifact Cache
// =============================================================================

/// The artifact store seen by the pipeline.
///
/// Applies the [`CachePolicy`] and fans out over one or more tiers ordered
/// fastest first. Reads stop at the first tier holding the blob and promote
/// it into the faster tiers; writes go through to every tier.
///
/// A disabled kind behaves as if nothing were stored: reads report absent and
/// writes are skipped without touching any tier.
pub struct ArtifactCache {
    policy: CachePolicy,
    tiers: Vec<Arc<dyn ArtifactStore>>,
}

impl ArtifactCache {
    /// Create a cache over `tiers`, fastest first.
    pub fn new(policy: CachePolicy, tiers: Vec<Arc<dyn ArtifactStore>>) -> Self {
        Self { policy, tiers }
    }

    /// A cache with no tiers; every lookup misses.
    pub fn disabled() -> Self {
        Self::new(CachePolicy::none(), Vec::new())
    }

    /// Whether `kind` is cacheable at all.
    pub fn is_enabled(&self, kind: VariantKind) -> bool {
        self.policy.allows(kind) && !self.tiers.is_empty()
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub async fn exists(&self, key: &CacheKey, kind: VariantKind) -> bool {
        if !self.is_enabled(kind) {
            return false;
        }
        for tier in &self.tiers {
            if tier.exists(key, kind).await {
                return true;
            }
        }
        false
    }

    /// Read a blob. Tier read errors are logged and treated as misses.
    pub async fn read(&self, key: &CacheKey, kind: VariantKind) -> Option<Bytes> {
        if !self.is_enabled(kind) {
            return None;
        }

        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.read(key, kind).await {
                Ok(Some(data)) => {
                    debug!(key = %key, kind = %kind, tier = tier.name(), "Artifact cache hit");
                    for faster in &self.tiers[..index] {
                        if let Err(e) = faster.write(key, kind, data.clone()).await {
                            warn!(tier = faster.name(), "Failed to promote artifact: {}", e);
                        }
                    }
                    return Some(data);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(tier = tier.name(), "Artifact read failed: {}", e);
                }
            }
        }

        debug!(key = %key, kind = %kind, "Artifact cache miss");
        None
    }

    /// Write a blob through every tier.
    ///
    /// Returns the first tier error, after attempting all tiers. Writing a
    /// disabled kind is a no-op.
    pub async fn write(&self, key: &CacheKey, kind: VariantKind, data: Bytes) -> Result<(), StoreError> {
        if !self.is_enabled(kind) {
            return Ok(());
        }

        let mut first_error = None;
        for tier in &self.tiers {
            if let Err(e) = tier.write(key, kind, data.clone()).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Write a blob, logging instead of returning a failure.
    pub async fn store(&self, key: &CacheKey, kind: VariantKind, data: Bytes) {
        if let Err(e) = self.write(key, kind, data).await {
            warn!(key = %key, kind = %kind, "Failed to cache artifact: {}", e);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
