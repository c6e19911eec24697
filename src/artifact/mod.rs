//! Content-addressed artifact cache.
//!
//! Every rendition of an expression (raw vector, raw bitmap, and compressed
//! variants of either) is an immutable blob addressed by the expression's
//! [`CacheKey`] and its [`VariantKind`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     RenderPipeline / Negotiator         │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ArtifactCache               │
//! │   (CachePolicy toggles, tier fan-out)   │
//! └──────────┬───────────────────┬──────────┘
//!            ▼                   ▼
//!   ┌─────────────────┐  ┌─────────────────┐
//!   │   MemoryStore   │  │    DiskStore    │
//!   │   (LRU, bytes)  │  │ (<key>.<suffix>)│
//!   └─────────────────┘  └─────────────────┘
//! ```

mod disk;
mod key;
mod memory;
mod store;
mod variant;

pub use disk::DiskStore;
pub use key::{CacheKey, DefaultKeyDeriver, DigestKeyDeriver, KeyDeriver};
pub use memory::{MemoryStore, DEFAULT_MEMORY_CACHE_CAPACITY};
pub use store::{ArtifactCache, ArtifactStore, CachePolicy};
pub use variant::{OutputKind, VariantKind};
