use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CacheError;
use crate::models::{AvailabilityRecord, MovieQuery};
use crate::services::clock::Clock;

/// Cache key for an availability record: one entry per movie per region
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub external_id: i64,
    /// Upper-case region code
    pub region: String,
}

impl CacheKey {
    pub fn new(external_id: i64, region: &str) -> Self {
        Self {
            external_id,
            region: region.trim().to_ascii_uppercase(),
        }
    }

    pub fn for_query(query: &MovieQuery) -> Self {
        Self::new(query.external_id, &query.region)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "avail:{}:{}", self.external_id, self.region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub record: AvailabilityRecord,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Storage behind the availability cache
///
/// Backends keep entries past `expires_at` for at least `retention` so the
/// resolver can fall back to stale data; expiry itself is judged by the front.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    async fn store(&self, entry: CacheEntry, retention: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Read-through/write-through availability cache
///
/// Backend failures are logged and never propagated: a failed read is a miss and
/// a failed write is dropped.
#[derive(Clone)]
pub struct AvailabilityCache {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    /// How long expired entries stay available for stale serving
    stale_retention: Duration,
}

impl AvailabilityCache {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>, stale_retention: Duration) -> Self {
        Self {
            backend,
            clock,
            stale_retention,
        }
    }

    /// Returns the entry only if it has not expired
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.load(key).await?;

        if entry.is_expired(self.clock.now()) {
            tracing::debug!(key = %key, expires_at = %entry.expires_at, "Cache entry expired");
            return None;
        }

        Some(entry)
    }

    /// Returns the entry whether or not it has expired
    pub async fn get_stale(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.load(key).await
    }

    pub async fn put(&self, key: &CacheKey, record: AvailabilityRecord, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let entry = CacheEntry {
            key: key.clone(),
            record,
            expires_at,
        };

        let retention = ttl.saturating_add(self.stale_retention);
        if let Err(e) = self.backend.store(entry, retention).await {
            tracing::error!(
                key = %key,
                backend = self.backend.name(),
                error = %e,
                "Failed to write availability cache"
            );
            return;
        }

        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached availability");
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.backend.remove(key).await {
            tracing::error!(
                key = %key,
                backend = self.backend.name(),
                error = %e,
                "Failed to invalidate availability cache"
            );
        }
    }

    async fn load(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.backend.load(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    backend = self.backend.name(),
                    error = %e,
                    "Availability cache read failed, treating as miss"
                );
                None
            }
        }
    }
}
