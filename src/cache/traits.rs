use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;

/// String-keyed byte store with per-entry TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get raw bytes from cache
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set raw bytes in cache. A zero TTL means no expiry.
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Delete a value from cache. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
