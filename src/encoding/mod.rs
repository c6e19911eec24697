//! HTTP content-coding negotiation.
//!
//! - [`AcceptEncoding`]: what the client advertised
//! - [`compress`]: gzip / deflate / brotli codecs
//! - [`CompressionNegotiator`]: picks, fetches or derives the representation
//!   to send

mod accept;
mod codec;
mod negotiator;

use std::fmt;

pub use accept::AcceptEncoding;
pub use codec::{compress, is_precompressed_media};
pub use negotiator::{CompressionNegotiator, NegotiationPolicy, Selection};

/// A supported content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Brotli,
    Gzip,
    Deflate,
}

impl Encoding {
    /// Preference order when several codings are acceptable.
    pub const PRIORITY: [Encoding; 3] = [Encoding::Brotli, Encoding::Gzip, Encoding::Deflate];

    /// Token used in `Accept-Encoding` / `Content-Encoding`.
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Brotli => "br",
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }

    /// Suffix appended to the raw artifact's file name.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Encoding::Brotli => ".br",
            Encoding::Gzip => ".gz",
            Encoding::Deflate => ".def.gz",
        }
    }

    /// Parse an `Accept-Encoding` token (case-insensitive).
    pub fn from_label(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("br") {
            Some(Encoding::Brotli)
        } else if token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip") {
            Some(Encoding::Gzip)
        } else if token.eq_ignore_ascii_case("deflate") {
            Some(Encoding::Deflate)
        } else {
            None
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
