//! Output and artifact variant kinds.

use std::fmt;

use crate::encoding::Encoding;

// =============================================================================
// Output Kind
// =============================================================================

/// What the client asked for: vector markup or a rasterized bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Vector,
    Bitmap,
}

impl OutputKind {
    /// File suffix, including the leading dot.
    pub fn suffix(self) -> &'static str {
        match self {
            OutputKind::Vector => ".svg",
            OutputKind::Bitmap => ".png",
        }
    }

    /// `Content-Type` sent with this kind of output.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputKind::Vector => "text/xml",
            OutputKind::Bitmap => "image/png",
        }
    }

    /// Match the output kind from a path or file name suffix.
    pub fn from_suffix(path: &str) -> Option<Self> {
        if path.ends_with(".svg") {
            Some(OutputKind::Vector)
        } else if path.ends_with(".png") {
            Some(OutputKind::Bitmap)
        } else {
            None
        }
    }

    /// Match the output kind from a query endpoint (`/tex2svg`, `/tex2png`).
    pub fn from_endpoint(path: &str) -> Option<Self> {
        match path {
            "/tex2svg" => Some(OutputKind::Vector),
            "/tex2png" => Some(OutputKind::Bitmap),
            _ => None,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Vector => f.write_str("svg"),
            OutputKind::Bitmap => f.write_str("png"),
        }
    }
}

// =============================================================================
// Variant Kind
// =============================================================================

/// The kind of an artifact stored for an expression.
///
/// Together with a [`CacheKey`](super::CacheKey) it addresses exactly one
/// immutable blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Vector markup produced by the renderer
    RawVector,

    /// Bitmap produced by the rasterizer
    RawBitmap,

    /// A compressed encoding of a raw artifact
    Compressed { encoding: Encoding, base: OutputKind },
}

impl VariantKind {
    /// The raw variant for an output kind.
    pub fn raw(kind: OutputKind) -> Self {
        match kind {
            OutputKind::Vector => VariantKind::RawVector,
            OutputKind::Bitmap => VariantKind::RawBitmap,
        }
    }

    /// File name suffix appended to the hex key on disk.
    pub fn file_suffix(self) -> String {
        match self {
            VariantKind::RawVector => OutputKind::Vector.suffix().to_string(),
            VariantKind::RawBitmap => OutputKind::Bitmap.suffix().to_string(),
            VariantKind::Compressed { encoding, base } => {
                format!("{}{}", base.suffix(), encoding.file_suffix())
            }
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::RawVector => f.write_str("raw-svg"),
            VariantKind::RawBitmap => f.write_str("raw-png"),
            VariantKind::Compressed { encoding, base } => write!(f, "{}-{}", base, encoding),
        }
    }
}
