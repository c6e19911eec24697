//! Timeout-bounded artifact production.
//!
//! - [`TimeoutSupervisor`]: races each stage against a deadline
//! - [`Renderer`] / [`CommandRenderer`]: TeX → vector markup
//! - [`Rasterizer`] / [`SvgRasterizer`]: vector markup → PNG
//! - [`RenderPipeline`]: cache lookup, render, rasterize, cache write

mod inflight;
mod raster;
mod render;
mod service;
mod supervisor;

pub use inflight::InFlight;
pub use raster::{rasterize_to_png, Rasterizer, SvgRasterizer, DEFAULT_RASTER_SCALE};
pub use render::{CommandRenderer, Renderer, END_OF_OPTIONS, TEX_PLACEHOLDER};
pub use service::{PendingRequest, RenderPipeline, Rendition};
pub use supervisor::{CancelPolicy, Stage, TimeoutSupervisor, DEFAULT_STAGE_TIMEOUT};
