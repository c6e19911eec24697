//! Configuration management for texserve.
//!
//! Options come from command-line arguments (clap) or `TEXSERVE_*`
//! environment variables, with defaults for everything. After
//! [`Config::validate`] the raw options are turned once into an immutable
//! [`Settings`] value that the rest of the process shares by `Arc`.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use texserve::config::Config;
//!
//! let settings = Config::parse().into_settings()?;
//! println!("Listening on {}", settings.http_address);
//! ```
//!
//! # Environment Variables
//!
//! - `TEXSERVE_HOST` - Bind address (default: 0.0.0.0)
//! - `TEXSERVE_PORT` - HTTP port (default: 2082)
//! - `TEXSERVE_HTTPS_PORT` - HTTPS port (default: off)
//! - `TEXSERVE_TLS_CERT`, `TEXSERVE_TLS_KEY` - PEM certificate and key
//! - `TEXSERVE_CACHE_DIR` - Artifact directory (default: ./cache)
//! - `TEXSERVE_WEB_ROOT` - Static file root (default: ./www)
//! - `TEXSERVE_TIMEOUT_MS` - Per-stage deadline (default: 5000)
//! - `TEXSERVE_CACHE_SVG`, `_PNG`, `_GZIP`, `_DEFLATE`, `_BROTLI` - Cache toggles
//! - `TEXSERVE_COMPRESS`, `TEXSERVE_BROTLI`, `TEXSERVE_COMPRESS_BITMAPS` - Compression
//! - `TEXSERVE_MEMORY_CACHE` - In-memory tier size in bytes, 0 disables it
//! - `TEXSERVE_RENDER_COMMAND` - Renderer program (default: tex2svg)
//! - `TEXSERVE_RENDER_ARGS` - Renderer arguments, comma-separated (default: {tex})
//! - `TEXSERVE_RASTER_SCALE` - Pixels per SVG unit (default: 1.0)
//! - `TEXSERVE_STRICT_TIMEOUTS` - Abort stages at the deadline
//! - `TEXSERVE_COALESCE` - Share concurrent identical renders
//! - `TEXSERVE_MAX_BODY_BYTES` - Request body cap (default: 65536)
//! - `TEXSERVE_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 86400)
//! - `TEXSERVE_CORS_ORIGINS` - Allowed origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::artifact::{CachePolicy, DEFAULT_MEMORY_CACHE_CAPACITY};
use crate::encoding::NegotiationPolicy;
use crate::pipeline::{CancelPolicy, DEFAULT_RASTER_SCALE, TEX_PLACEHOLDER};
use crate::server::{RouterConfig, DEFAULT_CACHE_MAX_AGE, DEFAULT_MAX_BODY_BYTES};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 2082;

/// Default per-stage deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default artifact directory.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default static file root.
pub const DEFAULT_WEB_ROOT: &str = "./www";

/// Default renderer program.
pub const DEFAULT_RENDER_COMMAND: &str = "tex2svg";

// =============================================================================
// CLI Arguments
// =============================================================================

/// texserve - Render TeX to SVG and PNG over HTTP.
///
/// Renditions are cached on disk by a digest of the expression, together
/// with gzip, deflate and brotli variants negotiated per request.
#[derive(Parser, Debug, Clone)]
#[command(name = "texserve")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the listeners to.
    #[arg(long, default_value = DEFAULT_HOST, env = "TEXSERVE_HOST")]
    pub host: String,

    /// HTTP port.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TEXSERVE_PORT")]
    pub port: u16,

    /// HTTPS port. Requires --tls-cert and --tls-key.
    #[arg(long, env = "TEXSERVE_HTTPS_PORT")]
    pub https_port: Option<u16>,

    /// PEM certificate chain for HTTPS.
    #[arg(long, env = "TEXSERVE_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key for HTTPS.
    #[arg(long, env = "TEXSERVE_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// Directory served for paths that are not render requests.
    #[arg(long, default_value = DEFAULT_WEB_ROOT, env = "TEXSERVE_WEB_ROOT")]
    pub web_root: PathBuf,

    /// Largest request body searched for `tex=`, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "TEXSERVE_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "TEXSERVE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // Pipeline Configuration
    // =========================================================================
    /// Deadline for each stage (render, rasterize, compress, body read).
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "TEXSERVE_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Drop stages at the deadline instead of letting them finish in the
    /// background. Late results are then never cached.
    #[arg(long, default_value_t = false, env = "TEXSERVE_STRICT_TIMEOUTS")]
    pub strict_timeouts: bool,

    /// Let concurrent requests for the same expression share one render.
    #[arg(long, default_value_t = false, env = "TEXSERVE_COALESCE")]
    pub coalesce: bool,

    /// Renderer program.
    #[arg(long, default_value = DEFAULT_RENDER_COMMAND, env = "TEXSERVE_RENDER_COMMAND")]
    pub render_command: String,

    /// Renderer argument, repeatable or comma-separated. `{tex}` is replaced
    /// by the expression; without it the expression is written to stdin.
    #[arg(
        long = "render-arg",
        default_value = TEX_PLACEHOLDER,
        allow_hyphen_values = true,
        env = "TEXSERVE_RENDER_ARGS",
        value_delimiter = ','
    )]
    pub render_args: Vec<String>,

    /// Pixels per SVG user unit when rasterizing.
    #[arg(long, default_value_t = DEFAULT_RASTER_SCALE, env = "TEXSERVE_RASTER_SCALE")]
    pub raster_scale: f32,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Directory holding cached artifacts.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "TEXSERVE_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Size of the in-memory cache tier in bytes (0 disables it).
    #[arg(long, default_value_t = DEFAULT_MEMORY_CACHE_CAPACITY, env = "TEXSERVE_MEMORY_CACHE")]
    pub memory_cache: usize,

    /// Cache rendered SVG.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TEXSERVE_CACHE_SVG")]
    pub cache_svg: bool,

    /// Cache rasterized PNG.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TEXSERVE_CACHE_PNG")]
    pub cache_png: bool,

    /// Cache gzip variants.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TEXSERVE_CACHE_GZIP")]
    pub cache_gzip: bool,

    /// Cache deflate variants.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TEXSERVE_CACHE_DEFLATE")]
    pub cache_deflate: bool,

    /// Cache brotli variants.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TEXSERVE_CACHE_BROTLI")]
    pub cache_brotli: bool,

    // =========================================================================
    // Compression Configuration
    // =========================================================================
    /// Negotiate compressed responses.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TEXSERVE_COMPRESS")]
    pub compress: bool,

    /// Offer brotli when the client accepts it.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TEXSERVE_BROTLI")]
    pub brotli: bool,

    /// Also compress PNG output.
    #[arg(long, default_value_t = false, env = "TEXSERVE_COMPRESS_BITMAPS")]
    pub compress_bitmaps: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "TEXSERVE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".to_string());
        }

        if let Some(https_port) = self.https_port {
            if self.tls_cert.is_none() || self.tls_key.is_none() {
                return Err(
                    "HTTPS is enabled but no certificate provided. \
                     Set --tls-cert and --tls-key (or TEXSERVE_TLS_CERT / TEXSERVE_TLS_KEY)"
                        .to_string(),
                );
            }
            if https_port == self.port {
                return Err(format!(
                    "HTTP and HTTPS cannot share port {}",
                    https_port
                ));
            }
        }

        if !self.raster_scale.is_finite() || self.raster_scale <= 0.0 {
            return Err("raster_scale must be a positive number".to_string());
        }

        if self.render_command.trim().is_empty() {
            return Err("render_command must not be empty".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the HTTP bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate and freeze into [`Settings`].
    pub fn into_settings(self) -> Result<Settings, String> {
        self.validate()?;

        let https = match (self.https_port, self.tls_cert.clone(), self.tls_key.clone()) {
            (Some(port), Some(cert), Some(key)) => Some(TlsSettings {
                address: format!("{}:{}", self.host, port),
                cert,
                key,
            }),
            _ => None,
        };

        let mut router = RouterConfig::new(self.web_root.clone())
            .with_cache_max_age(self.cache_max_age)
            .with_max_body_bytes(self.max_body_bytes)
            .with_tracing(!self.no_tracing);
        if let Some(origins) = self.cors_origins.clone() {
            router = router.with_cors_origins(origins);
        }

        Ok(Settings {
            http_address: self.bind_address(),
            https,
            cache_dir: self.cache_dir,
            memory_cache_bytes: self.memory_cache,
            cache_policy: CachePolicy {
                vector: self.cache_svg,
                bitmap: self.cache_png,
                gzip: self.cache_gzip,
                deflate: self.cache_deflate,
                brotli: self.cache_brotli,
            },
            negotiation: NegotiationPolicy {
                enabled: self.compress,
                brotli: self.brotli,
                compress_bitmaps: self.compress_bitmaps,
            },
            stage_timeout: Duration::from_millis(self.timeout_ms),
            cancel_policy: if self.strict_timeouts {
                CancelPolicy::Abort
            } else {
                CancelPolicy::Detach
            },
            coalesce: self.coalesce,
            render_command: self.render_command,
            render_args: self.render_args,
            raster_scale: self.raster_scale,
            router,
            verbose: self.verbose,
        })
    }
}

// =============================================================================
// Settings
// =============================================================================

/// HTTPS listener settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TlsSettings {
    pub address: String,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Validated, immutable process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub http_address: String,
    pub https: Option<TlsSettings>,
    pub cache_dir: PathBuf,
    pub memory_cache_bytes: usize,
    pub cache_policy: CachePolicy,
    pub negotiation: NegotiationPolicy,
    pub stage_timeout: Duration,
    pub cancel_policy: CancelPolicy,
    pub coalesce: bool,
    pub render_command: String,
    pub render_args: Vec<String>,
    pub raster_scale: f32,
    pub router: RouterConfig,
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
