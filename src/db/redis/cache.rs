use redis::AsyncCommands;
use redis::Client;
use std::time::Duration;

use crate::db::cache::{CacheBackend, CacheEntry, CacheKey};
use crate::error::CacheError;

/// Opens a Redis client; connections are made lazily per operation
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis cache backend for multi-instance deployments
///
/// Entries are stored as JSON under `avail:{external_id}:{REGION}` with a Redis TTL
/// equal to the retention, so expired-but-retained entries remain readable for
/// stale serving.
#[derive(Clone)]
pub struct RedisBackend {
    redis_client: Client,
}

impl RedisBackend {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

/// Redis rejects `SET EX 0`
fn retention_secs(retention: Duration) -> u64 {
    retention.as_secs().max(1)
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

        match cached {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, entry: CacheEntry, retention: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(&entry)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(format!("{}", entry.key), json, retention_secs(retention))
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(format!("{}", key)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
