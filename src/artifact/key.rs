//! Cache key derivation.
//!
//! An expression is addressed by the hex digest of its UTF-8 bytes. The
//! digest algorithm is a strategy behind [`KeyDeriver`]; swapping it changes
//! key values but not the on-disk naming contract (`<hex>.<suffix>`).

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use sha2::{Digest, Sha256};

// =============================================================================
// Cache Key
// =============================================================================

/// Stable, fixed-length identifier for an expression.
///
/// Cheap to clone; the hex string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Wrap an already-computed hex digest.
    pub fn from_hex(hex: impl Into<Arc<str>>) -> Self {
        Self(hex.into())
    }

    /// The key as lowercase hex.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Key Derivers
// =============================================================================

/// Maps expression bytes to a [`CacheKey`].
///
/// Implementations must be pure and total, and must not depend on any
/// process-local state so that keys survive restarts.
pub trait KeyDeriver: Send + Sync {
    /// Derive the key for `expression`.
    fn derive(&self, expression: &[u8]) -> CacheKey;

    /// Short algorithm name, used in startup logging.
    fn algorithm(&self) -> &'static str;
}

/// Key deriver backed by any RustCrypto [`Digest`].
///
/// ```
/// use texserve::artifact::{DigestKeyDeriver, KeyDeriver};
///
/// let deriver = DigestKeyDeriver::<sha2::Sha256>::new();
/// let key = deriver.derive(b"x^2");
/// assert_eq!(key.as_str().len(), 64);
/// assert_eq!(key, deriver.derive(b"x^2"));
/// ```
pub struct DigestKeyDeriver<D> {
    name: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D> DigestKeyDeriver<D> {
    /// Create a deriver with a custom algorithm label.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            _digest: PhantomData,
        }
    }
}

impl DigestKeyDeriver<Sha256> {
    /// SHA-256 deriver, the default strategy.
    pub fn new() -> Self {
        Self::named("sha256")
    }
}

impl Default for DigestKeyDeriver<Sha256> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Digest> KeyDeriver for DigestKeyDeriver<D> {
    fn derive(&self, expression: &[u8]) -> CacheKey {
        CacheKey::from_hex(hex::encode(D::digest(expression)))
    }

    fn algorithm(&self) -> &'static str {
        self.name
    }
}

/// Default deriver used by the server.
pub type DefaultKeyDeriver = DigestKeyDeriver<Sha256>;

// =============================================================================
// Tests
// =============================================================================
