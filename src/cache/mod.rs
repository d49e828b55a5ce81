mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod room_listing;
mod traits;

use std::sync::Arc;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;
pub use room_listing::{ROOM_LISTING_KEY, RoomListing};
pub use traits::Cache;

use crate::config::CacheConfig;

/// Build the configured cache backend, or `None` when caching is disabled.
pub async fn from_config(config: &CacheConfig) -> CacheResult<Option<Arc<dyn Cache>>> {
    match config {
        CacheConfig::None => Ok(None),
        CacheConfig::Memory(cfg) => {
            tracing::info!(max_entries = cfg.max_entries, "Using in-memory cache");
            Ok(Some(Arc::new(MemoryCache::new(cfg))))
        }
        #[cfg(feature = "redis")]
        CacheConfig::Redis(cfg) => Ok(Some(Arc::new(RedisCache::from_config(cfg).await?))),
        #[cfg(not(feature = "redis"))]
        CacheConfig::Redis(_) => Err(CacheError::Internal(
            "Redis cache configured but the `redis` feature is not enabled".to_string(),
        )),
    }
}
