//! Extracted posts waiting for the user's selection. One pending import per
//! user; a new upload replaces the previous one.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extractor::models::ExtractedPost;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingImport {
    pub import_id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub posts: Vec<ExtractedPost>,
    pub created_at: DateTime<Utc>,
}

impl PendingImport {
    pub fn new(user_id: Uuid, filename: impl Into<String>, posts: Vec<ExtractedPost>) -> Self {
        PendingImport {
            import_id: Uuid::new_v4(),
            user_id,
            filename: filename.into(),
            posts,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait PendingImportStore: Send + Sync {
    /// Stores `import`, replacing any pending import of the same user.
    async fn save(&self, import: &PendingImport) -> Result<(), AppError>;
    async fn load(&self, user_id: Uuid) -> Result<Option<PendingImport>, AppError>;
    /// Removes and returns the pending import in one step, so two concurrent
    /// confirms never both receive it.
    async fn take(&self, user_id: Uuid) -> Result<Option<PendingImport>, AppError>;
    /// Puts a taken import back unless a newer upload already replaced it.
    async fn restore(&self, import: &PendingImport) -> Result<(), AppError>;
    async fn discard(&self, user_id: Uuid) -> Result<(), AppError>;
}

fn pending_key(user_id: Uuid) -> String {
    format!("pending_import:{user_id}")
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisPendingStore {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisPendingStore {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn connect(redis_url: &str, ttl_secs: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        info!(ttl_secs, "Redis pending import store connected");
        Ok(Self::new(manager, ttl_secs))
    }
}

fn store_error(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Store(format!("{context}: {e}"))
}

/// An entry that no longer deserializes is treated as absent.
fn decode_entry(key: &str, raw: &str) -> Option<PendingImport> {
    match serde_json::from_str(raw) {
        Ok(import) => Some(import),
        Err(e) => {
            warn!(key = %key, error = %e, "Ignoring unreadable pending import");
            None
        }
    }
}

#[async_trait]
impl PendingImportStore for RedisPendingStore {
    async fn save(&self, import: &PendingImport) -> Result<(), AppError> {
        let key = pending_key(import.user_id);
        let data = serde_json::to_string(import)
            .map_err(|e| store_error("failed to serialize pending import", e))?;

        let mut conn = self.redis.clone();
        redis::cmd("SETEX")
            .arg(&key)
            .arg(self.ttl_secs)
            .arg(data)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| store_error("failed to save pending import", e))?;

        debug!(key = %key, posts = import.posts.len(), "Pending import saved");
        Ok(())
    }

    async fn load(&self, user_id: Uuid) -> Result<Option<PendingImport>, AppError> {
        let key = pending_key(user_id);
        let mut conn = self.redis.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("failed to load pending import", e))?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let import = decode_entry(&key, &raw);
        if import.is_none() {
            if let Err(e) = redis::cmd("DEL")
                .arg(&key)
                .query_async::<_, ()>(&mut conn)
                .await
            {
                warn!(key = %key, error = %e, "Failed to delete unreadable pending import");
            }
        }
        Ok(import)
    }

    async fn take(&self, user_id: Uuid) -> Result<Option<PendingImport>, AppError> {
        let key = pending_key(user_id);
        let mut conn = self.redis.clone();
        let raw: Option<String> = redis::cmd("GETDEL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("failed to take pending import", e))?;

        Ok(raw.and_then(|raw| decode_entry(&key, &raw)))
    }

    async fn restore(&self, import: &PendingImport) -> Result<(), AppError> {
        let key = pending_key(import.user_id);
        let data = serde_json::to_string(import)
            .map_err(|e| store_error("failed to serialize pending import", e))?;

        let mut conn = self.redis.clone();
        let written: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(data)
            .arg("EX")
            .arg(self.ttl_secs)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("failed to restore pending import", e))?;

        debug!(key = %key, restored = written.is_some(), "Pending import restore");
        Ok(())
    }

    async fn discard(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        redis::cmd("DEL")
            .arg(pending_key(user_id))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| store_error("failed to discard pending import", e))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-process
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store used when no Redis is configured. Entries expire after
/// the same TTL the Redis store applies.
pub struct MemoryPendingStore {
    entries: RwLock<HashMap<Uuid, (Instant, PendingImport)>>,
    ttl: Duration,
}

impl MemoryPendingStore {
    pub fn new(ttl_secs: u64) -> Self {
        MemoryPendingStore {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }
}

#[async_trait]
impl PendingImportStore for MemoryPendingStore {
    async fn save(&self, import: &PendingImport) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (saved_at, _)| saved_at.elapsed() < self.ttl);
        entries.insert(import.user_id, (Instant::now(), import.clone()));
        Ok(())
    }

    async fn load(&self, user_id: Uuid) -> Result<Option<PendingImport>, AppError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&user_id)
            .filter(|(saved_at, _)| saved_at.elapsed() < self.ttl)
            .map(|(_, import)| import.clone()))
    }

    async fn take(&self, user_id: Uuid) -> Result<Option<PendingImport>, AppError> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(&user_id)
            .filter(|(saved_at, _)| saved_at.elapsed() < self.ttl)
            .map(|(_, import)| import))
    }

    async fn restore(&self, import: &PendingImport) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        entries
            .entry(import.user_id)
            .or_insert_with(|| (Instant::now(), import.clone()));
        Ok(())
    }

    async fn discard(&self, user_id: Uuid) -> Result<(), AppError> {
        self.entries.write().await.remove(&user_id);
        Ok(())
    }
}
