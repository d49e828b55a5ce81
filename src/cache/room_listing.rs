//! Cache-aside memoization of the full room listing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use super::{error::CacheResult, traits::Cache};
use crate::{
    db::{DbResult, RoomRepo},
    models::Room,
};

/// Key the listing is stored under.
pub const ROOM_LISTING_KEY: &str = "rooms";

/// Room listing read through an optional cache.
///
/// A cache failure never fails a read: it is logged and treated as a miss.
/// After a miss the listing is written back in a detached task. The write is
/// dropped if the listing was invalidated since it was read, so a slow
/// write-back cannot resurrect rooms deleted in the meantime.
#[derive(Clone)]
pub struct RoomListing {
    repo: Arc<dyn RoomRepo>,
    cache: Option<Arc<dyn Cache>>,
    ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl RoomListing {
    pub fn new(repo: Arc<dyn RoomRepo>, cache: Option<Arc<dyn Cache>>, ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Listing without a cache in front.
    pub fn uncached(repo: Arc<dyn RoomRepo>) -> Self {
        Self::new(repo, None, Duration::ZERO)
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// All tracked rooms, oldest first.
    pub async fn fetch(&self) -> DbResult<Vec<Room>> {
        let Some(cache) = &self.cache else {
            return self.repo.fetch().await;
        };

        match cache.get_bytes(ROOM_LISTING_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<Room>>(&bytes) {
                Ok(rooms) => {
                    tracing::debug!(rooms = rooms.len(), "Room listing served from cache");
                    return Ok(rooms);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding undecodable room listing from cache");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Room listing cache unavailable, reading from store");
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let rooms = self.repo.fetch().await?;
        self.repopulate(Arc::clone(cache), &rooms, generation);
        Ok(rooms)
    }

    fn repopulate(&self, cache: Arc<dyn Cache>, rooms: &[Room], generation: u64) {
        let bytes = match serde_json::to_vec(rooms) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize room listing for cache");
                return;
            }
        };
        let ttl = self.ttl;
        let current = Arc::clone(&self.generation);

        tokio::spawn(async move {
            if current.load(Ordering::SeqCst) != generation {
                tracing::debug!("Room listing changed while reading, skipping cache write-back");
                return;
            }
            if let Err(e) = cache.set_bytes(ROOM_LISTING_KEY, &bytes, ttl).await {
                tracing::warn!(error = %e, "Failed to repopulate room listing cache");
                return;
            }
            // Invalidated while the write was in flight.
            if current.load(Ordering::SeqCst) != generation
                && let Err(e) = cache.delete(ROOM_LISTING_KEY).await
            {
                tracing::warn!(error = %e, "Failed to drop stale room listing from cache");
            }
        });
    }

    /// Drop the cached listing so the next fetch reads the store.
    pub async fn invalidate(&self) -> CacheResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match &self.cache {
            Some(cache) => cache.delete(ROOM_LISTING_KEY).await,
            None => Ok(()),
        }
    }
}
