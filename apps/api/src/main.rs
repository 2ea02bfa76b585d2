mod config;
mod db;
mod errors;
mod extractor;
mod imports;
mod models;
mod posts;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::extractor::backend::FallbackBackend;
use crate::imports::pending::{MemoryPendingStore, PendingImportStore, RedisPendingStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PostForge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Pending imports: Redis when configured, process memory otherwise
    let pending: Arc<dyn PendingImportStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisPendingStore::connect(url, config.pending_import_ttl_secs).await?),
        None => {
            info!("REDIS_URL not set, keeping pending imports in memory");
            Arc::new(MemoryPendingStore::new(config.pending_import_ttl_secs))
        }
    };

    info!(
        parser = ?config.import_parser,
        engagement_merge = ?config.engagement_merge,
        max_pdf_bytes = config.max_pdf_bytes,
        "PDF import configured"
    );

    std::fs::create_dir_all(&config.pdf_upload_dir).with_context(|| {
        format!(
            "failed to create upload directory {}",
            config.pdf_upload_dir.display()
        )
    })?;

    // Build app state
    let state = AppState {
        db,
        pending,
        pdf_backend: Arc::new(FallbackBackend::default()),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web frontend has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
