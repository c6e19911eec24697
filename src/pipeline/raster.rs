//! Vector → bitmap rasterization.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use tracing::debug;

use crate::error::StageError;

/// Default rasterization scale (1 SVG user unit = 1 pixel).
pub const DEFAULT_RASTER_SCALE: f32 = 1.0;

/// Largest bitmap edge we are willing to allocate.
pub const MAX_RASTER_DIMENSION: u32 = 16_384;

/// Turns vector markup into encoded bitmap bytes.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, svg: Bytes) -> Result<Bytes, StageError>;
}

/// PNG rasterizer backed by `resvg`.
///
/// Rendering runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct SvgRasterizer {
    scale: f32,
}

impl SvgRasterizer {
    pub fn new() -> Self {
        Self::with_scale(DEFAULT_RASTER_SCALE)
    }

    /// Create a rasterizer producing `scale` pixels per SVG user unit.
    pub fn with_scale(scale: f32) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl Default for SvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rasterizer for SvgRasterizer {
    async fn rasterize(&self, svg: Bytes) -> Result<Bytes, StageError> {
        let scale = self.scale;
        let png = tokio::task::spawn_blocking(move || rasterize_to_png(&svg, scale))
            .await
            .map_err(|e| StageError::rasterize(format!("rasterizer task failed: {}", e)))??;
        Ok(Bytes::from(png))
    }
}

fn to_pixels(length: f32) -> Result<u32, StageError> {
    if !length.is_finite() || length <= 0.0 {
        return Err(StageError::rasterize("SVG has invalid width or height"));
    }
    let pixels = length.ceil() as u32;
    if pixels > MAX_RASTER_DIMENSION {
        return Err(StageError::rasterize(format!(
            "raster size {} exceeds {}",
            pixels, MAX_RASTER_DIMENSION
        )));
    }
    Ok(pixels.max(1))
}

/// Render SVG markup to PNG bytes.
pub fn rasterize_to_png(svg: &[u8], scale: f32) -> Result<Vec<u8>, StageError> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg, &options)
        .map_err(|e| StageError::rasterize(format!("invalid SVG: {}", e)))?;

    let size = tree.size();
    let width = to_pixels(size.width() * scale)?;
    let height = to_pixels(size.height() * scale)?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| StageError::rasterize("failed to allocate pixmap"))?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; PNG wants straight alpha
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();

    let image = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| StageError::rasterize("pixel buffer size mismatch"))?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| StageError::rasterize(format!("PNG encoding failed: {}", e)))?;

    debug!(width, height, bytes = png.len(), "Rasterized SVG");

    Ok(png)
}
