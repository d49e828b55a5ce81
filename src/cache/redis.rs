use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use super::{
    error::{CacheError, CacheResult},
    traits::Cache,
};
use crate::config::RedisCacheConfig;

/// Redis-backed cache over a single multiplexed connection.
///
/// All keys are stored under the configured prefix.
pub struct RedisCache {
    connection: MultiplexedConnection,
    key_prefix: String,
}

impl RedisCache {
    pub async fn from_config(config: &RedisCacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection = tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::Internal(format!(
                "timed out connecting to Redis after {}s",
                config.connect_timeout_secs
            ))
        })??;

        tracing::info!(key_prefix = %config.key_prefix, "Connected to Redis cache");

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let data: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.prefixed_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(data)
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let full_key = self.prefixed_key(key);

        if ttl.as_secs() > 0 {
            let _: () = redis::cmd("SETEX")
                .arg(&full_key)
                .arg(ttl.as_secs())
                .arg(value)
                .query_async(&mut conn)
                .await?;
        } else {
            let _: () = redis::cmd("SET")
                .arg(&full_key)
                .arg(value)
                .query_async(&mut conn)
                .await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("DEL")
            .arg(self.prefixed_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
