//! HTTP server layer for texserve.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │      /tex2svg  /tex2png  /{expr}.svg  /{expr}.png  /health      │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────┐  ┌───────────┐  │
//! │  │   request   │  │  handlers   │  │  routes  │  │  static   │  │
//! │  │  (parsing)  │  │ (responses) │  │ (config) │  │  (files)  │  │
//! │  └─────────────┘  └─────────────┘  └──────────┘  └───────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod request;
pub mod routes;
pub mod static_files;

pub use handlers::{
    fallback_handler, health_handler, tex_handler, AppState, ErrorResponse, HealthResponse,
    ARTIFACT_CACHE_HEADER,
};
pub use request::{expression_from_path, tex_param};
pub use routes::{create_router, RouterConfig, DEFAULT_CACHE_MAX_AGE, DEFAULT_MAX_BODY_BYTES};
pub use static_files::{content_type_for, serve_static};
