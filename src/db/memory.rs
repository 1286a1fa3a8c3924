use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::db::cache::{CacheBackend, CacheEntry, CacheKey};
use crate::error::CacheError;
use crate::services::clock::Clock;

struct StoredEntry {
    entry: CacheEntry,
    retain_until: DateTime<Utc>,
}

/// In-process cache backend for single-instance deployments
///
/// Entries past their retention are dropped when next read; nothing sweeps them.
pub struct MemoryBackend {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, StoredEntry>>,
}

impl MemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryBackend {
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let now = self.clock.now();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(stored) if now <= stored.retain_until => {
                    return Ok(Some(stored.entry.clone()));
                }
                Some(_) => {}
            }
        }

        // Past retention: drop it, unless a concurrent write replaced it
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|s| now > s.retain_until) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn store(&self, entry: CacheEntry, retention: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        let retain_until = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|r| now.checked_add_signed(r))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entries = self.entries.write().await;
        entries.insert(
            entry.key.clone(),
            StoredEntry {
                entry,
                retain_until,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
