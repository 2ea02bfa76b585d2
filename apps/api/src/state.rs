use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::extractor::backend::PdfTextBackend;
use crate::imports::pending::PendingImportStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Redis-backed when `REDIS_URL` is set, in-memory otherwise.
    pub pending: Arc<dyn PendingImportStore>,
    /// Pluggable text extraction. Default: pdf-extract with lopdf fallback.
    pub pdf_backend: Arc<dyn PdfTextBackend>,
    pub config: Config,
}
