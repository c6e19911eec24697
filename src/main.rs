//! texserve - Render TeX to SVG and PNG over HTTP.
//!
//! This binary starts the HTTP (and optional HTTPS) listeners and wires all
//! components together.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use texserve::{
    artifact::{ArtifactCache, ArtifactStore, DiskStore, MemoryStore},
    config::{Config, Settings, TlsSettings},
    encoding::CompressionNegotiator,
    pipeline::{CommandRenderer, RenderPipeline, SvgRasterizer, TimeoutSupervisor},
    server::create_router,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    let settings = match config.into_settings() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print_banner();
    log_settings(&settings);

    let router = match build_router(&settings).await {
        Ok(router) => router,
        Err(e) => {
            error!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let http = serve_http(settings.http_address.clone(), router.clone());

    let result = match settings.https.clone() {
        Some(tls) => tokio::try_join!(http, serve_https(tls, router)).map(|_| ()),
        None => http.await,
    };

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("  _                                    ");
    info!(" | |_ _____  _____  ___ _ ____   _____ ");
    info!(" | __/ _ \\ \\/ / __|/ _ \\ '__\\ \\ / / _ \\");
    info!(" | ||  __/>  <\\__ \\  __/ |   \\ V /  __/");
    info!("  \\__\\___/_/\\_\\___/\\___|_|    \\_/ \\___|");
    info!("");
    info!("                                  v{}", version);
}

fn log_settings(settings: &Settings) {
    info!("Configuration:");
    info!(
        "  Renderer: {} {}",
        settings.render_command,
        settings.render_args.join(" ")
    );
    info!("  Cache directory: {}", settings.cache_dir.display());
    info!("  Web root: {}", settings.router.web_root.display());
    info!(
        "  Stage timeout: {}ms ({:?})",
        settings.stage_timeout.as_millis(),
        settings.cancel_policy
    );

    let policy = settings.cache_policy;
    info!(
        "  Cached kinds: svg={} png={} gzip={} deflate={} brotli={}",
        policy.vector, policy.bitmap, policy.gzip, policy.deflate, policy.brotli
    );
    if settings.memory_cache_bytes > 0 {
        info!(
            "  Memory tier: {}MB",
            settings.memory_cache_bytes / (1024 * 1024)
        );
    } else {
        info!("  Memory tier: disabled");
    }

    if settings.negotiation.enabled {
        info!(
            "  Compression: on (brotli={}, bitmaps={})",
            settings.negotiation.brotli, settings.negotiation.compress_bitmaps
        );
    } else {
        warn!("  Compression: DISABLED - every response is sent uncompressed");
    }
    if settings.coalesce {
        info!("  Coalescing identical in-flight renders");
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "texserve=debug,tower_http=debug"
    } else {
        "texserve=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Assemble the cache tiers, collaborators and router.
async fn build_router(settings: &Settings) -> Result<Router, String> {
    let disk = DiskStore::open(&settings.cache_dir)
        .await
        .map_err(|e| e.to_string())?;

    let mut tiers: Vec<Arc<dyn ArtifactStore>> = Vec::new();
    if settings.memory_cache_bytes > 0 {
        tiers.push(Arc::new(MemoryStore::with_capacity(
            settings.memory_cache_bytes,
        )));
    }
    tiers.push(Arc::new(disk));

    let cache = Arc::new(ArtifactCache::new(settings.cache_policy, tiers));
    let supervisor =
        TimeoutSupervisor::new(settings.stage_timeout).with_policy(settings.cancel_policy);

    let renderer = CommandRenderer::new(
        settings.render_command.clone(),
        settings.render_args.clone(),
    );
    let rasterizer = SvgRasterizer::with_scale(settings.raster_scale);

    let pipeline = RenderPipeline::new(
        Arc::clone(&cache),
        Arc::new(renderer),
        Arc::new(rasterizer),
        supervisor,
    )
    .with_coalescing(settings.coalesce);
    let negotiator = CompressionNegotiator::new(cache, supervisor, settings.negotiation);

    Ok(create_router(pipeline, negotiator, settings.router.clone()))
}

async fn serve_http(address: String, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| {
            error!("Failed to bind to {}: {}", address, e);
            e
        })?;

    info!("  HTTP listening on: http://{}", address);
    info!("    curl 'http://{}/tex2svg?tex=x%5E2'", address);

    axum::serve(listener, router).await
}

async fn serve_https(tls: TlsSettings, router: Router) -> std::io::Result<()> {
    let address: SocketAddr = tls.address.parse().map_err(|e| {
        error!("Invalid HTTPS address {}: {}", tls.address, e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
        .await
        .map_err(|e| {
            error!(
                "Failed to load TLS certificate {} / key {}: {}",
                tls.cert.display(),
                tls.key.display(),
                e
            );
            e
        })?;

    info!("  HTTPS listening on: https://{}", address);

    axum_server::bind_rustls(address, rustls)
        .serve(router.into_make_service())
        .await
}
