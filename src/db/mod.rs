pub mod cache;
pub mod memory;
pub mod redis;

pub use cache::{AvailabilityCache, CacheBackend, CacheEntry, CacheKey};
pub use memory::MemoryBackend;
pub use self::redis::{create_redis_client, RedisBackend};
