//! Compression codecs.

use std::io::{self, Write};

use brotli::enc::backward_references::BrotliEncoderParams;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use tracing::debug;

use super::Encoding;

/// Media types that are already compressed; re-compressing them wastes CPU
/// and rarely saves bytes.
const PRECOMPRESSED_MEDIA: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
    "video/",
    "audio/",
    "application/zip",
    "application/gzip",
    "application/x-gzip",
    "application/x-7z-compressed",
    "font/woff",
    "font/woff2",
];

/// Whether `mime_type` names an already-compressed format.
pub fn is_precompressed_media(mime_type: &str) -> bool {
    PRECOMPRESSED_MEDIA
        .iter()
        .any(|prefix| mime_type.starts_with(prefix))
}

/// Compress `data` with `encoding`.
///
/// This is CPU-bound; async callers run it on the blocking pool.
pub fn compress(data: &[u8], encoding: Encoding) -> io::Result<Vec<u8>> {
    let output = match encoding {
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(data)?;
            encoder.finish()?
        }
        Encoding::Deflate => {
            // HTTP "deflate" is the zlib format (RFC 1950)
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(data)?;
            encoder.finish()?
        }
        Encoding::Brotli => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            brotli::enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            output
        }
    };

    debug!(
        encoding = %encoding,
        original = data.len(),
        compressed = output.len(),
        "Compressed payload"
    );

    Ok(output)
}
