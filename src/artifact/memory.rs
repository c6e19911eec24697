//! In-process artifact tier.
//!
//! An LRU front tier that keeps recently served artifacts in memory so hot
//! expressions skip the file system entirely.
//!
//! # Size-Based Eviction
//!
//! The tier tracks the total size of cached blobs in bytes and evicts
//! least-recently-used entries when the capacity is exceeded. A blob larger
//! than the whole capacity is never retained.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

use super::key::CacheKey;
use super::store::ArtifactStore;
use super::variant::VariantKind;
use crate::error::StoreError;

/// Default memory tier capacity: 64MB
pub const DEFAULT_MEMORY_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

type EntryKey = (CacheKey, VariantKind);

struct Entries {
    lru: LruCache<EntryKey, Bytes>,
    size: usize,
}

/// LRU memory tier with size-based capacity.
///
/// # Example
///
/// ```
/// use texserve::artifact::{ArtifactStore, CacheKey, MemoryStore, VariantKind};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryStore::new();
///     let key = CacheKey::from_hex("c0ffee");
///
///     store.write(&key, VariantKind::RawVector, Bytes::from_static(b"<svg/>")).await.unwrap();
///     let cached = store.read(&key, VariantKind::RawVector).await.unwrap();
///     assert_eq!(cached, Some(Bytes::from_static(b"<svg/>")));
/// }
/// ```
pub struct MemoryStore {
    entries: RwLock<Entries>,
    max_size: usize,
}

impl MemoryStore {
    /// Create a memory tier with default capacity (64MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CACHE_CAPACITY)
    }

    /// Create a memory tier holding at most `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a memory tier with both a byte and an entry bound.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(Entries {
                lru: LruCache::new(max_entries),
                size: 0,
            }),
            max_size,
        }
    }

    /// Number of cached blobs.
    pub async fn len(&self) -> usize {
        self.entries.read().await.lru.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.lru.is_empty()
    }

    /// Total bytes currently cached.
    pub async fn size(&self) -> usize {
        self.entries.read().await.size
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Drop every cached blob.
    pub async fn clear(&self) {
        let mut guard = self.entries.write().await;
        guard.lru.clear();
        guard.size = 0;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn exists(&self, key: &CacheKey, kind: VariantKind) -> bool {
        let entries = self.entries.read().await;
        entries.lru.contains(&(key.clone(), kind))
    }

    async fn read(&self, key: &CacheKey, kind: VariantKind) -> Result<Option<Bytes>, StoreError> {
        // Write lock: a hit updates recency.
        let mut entries = self.entries.write().await;
        Ok(entries.lru.get(&(key.clone(), kind)).cloned())
    }

    async fn write(&self, key: &CacheKey, kind: VariantKind, data: Bytes) -> Result<(), StoreError> {
        if data.len() > self.max_size {
            return Ok(());
        }

        let mut guard = self.entries.write().await;
        let entries = &mut *guard;
        let data_size = data.len();

        // `push` hands back either the replaced value or the evicted LRU entry
        if let Some((_, old)) = entries.lru.push((key.clone(), kind), data) {
            entries.size = entries.size.saturating_sub(old.len());
        }
        entries.size += data_size;

        while entries.size > self.max_size {
            match entries.lru.pop_lru() {
                Some((_, evicted)) => entries.size = entries.size.saturating_sub(evicted.len()),
                None => break,
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// Tests
// =============================================================================
