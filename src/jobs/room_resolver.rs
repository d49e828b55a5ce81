//! Room resolver: the reconciliation sweep.
//!
//! Each tick lists tracked rooms oldest first and, for every room past the
//! age threshold:
//! 1. marks it resolved on the omnichannel platform
//! 2. deletes the local record
//! 3. invalidates the cached room listing
//!
//! A failure at any step is logged and the sweep moves on to the next room;
//! the room stays tracked and is retried on the next tick. Only a failure to
//! list the rooms aborts a tick.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    cache::RoomListing,
    client::ClientError,
    config::{RoomResolverConfig, YoungRoomPolicy},
    db::{DbError, RoomRepo},
    models::{Room, RoomFilter},
    omnichannel::Omnichannel,
    sanitizer::Sanitizer,
};

#[derive(Debug, Error)]
pub enum RoomResolverError {
    #[error("failed to fetch rooms: {0}")]
    Fetch(#[source] DbError),
}

/// Results from a single tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoomResolverRunResult {
    /// Rooms whose age was examined.
    pub rooms_scanned: u64,
    /// Rooms marked resolved on the platform.
    pub rooms_resolved: u64,
    /// Local rows removed.
    pub rooms_deleted: u64,
    pub resolve_failures: u64,
    pub delete_failures: u64,
    pub invalidation_failures: u64,
    /// Young rooms passed over under [`YoungRoomPolicy::Skip`].
    pub young_rooms_skipped: u64,
    /// The tick ended at a young room under [`YoungRoomPolicy::Stop`].
    pub stopped_early: bool,
    pub duration_ms: u64,
}

impl RoomResolverRunResult {
    pub fn has_activity(&self) -> bool {
        self.rooms_resolved > 0 || self.has_failures()
    }

    pub fn has_failures(&self) -> bool {
        self.resolve_failures > 0 || self.delete_failures > 0 || self.invalidation_failures > 0
    }
}

pub struct RoomResolver {
    listing: RoomListing,
    repo: Arc<dyn RoomRepo>,
    omnichannel: Arc<dyn Omnichannel>,
    sanitizer: Arc<Sanitizer>,
    age_threshold: chrono::Duration,
    policy: YoungRoomPolicy,
    operation_timeout: Duration,
}

impl RoomResolver {
    pub fn new(
        listing: RoomListing,
        repo: Arc<dyn RoomRepo>,
        omnichannel: Arc<dyn Omnichannel>,
        config: &RoomResolverConfig,
    ) -> Self {
        Self {
            listing,
            repo,
            omnichannel,
            sanitizer: Arc::new(Sanitizer::default()),
            age_threshold: chrono::Duration::seconds(
                i64::try_from(config.age_threshold_secs).unwrap_or(i64::MAX),
            ),
            policy: config.young_room_policy,
            operation_timeout: config.operation_timeout(),
        }
    }

    /// Sanitizer used when logging upstream error bodies.
    pub fn with_sanitizer(mut self, sanitizer: Arc<Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Run one sweep against the current time, inside its own span.
    pub async fn run_tick(&self) -> Result<RoomResolverRunResult, RoomResolverError> {
        let span = tracing::info_span!("room_resolver_tick", tick_id = %Uuid::new_v4());
        self.run_tick_at(Utc::now()).instrument(span).await
    }

    /// Run one sweep, computing room ages against `now`.
    pub async fn run_tick_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RoomResolverRunResult, RoomResolverError> {
        let start = Instant::now();
        let mut result = RoomResolverRunResult::default();

        let rooms = match tokio::time::timeout(self.operation_timeout, self.listing.fetch()).await
        {
            Ok(Ok(rooms)) => rooms,
            Ok(Err(e)) => return Err(RoomResolverError::Fetch(e)),
            Err(_) => {
                return Err(RoomResolverError::Fetch(DbError::Internal(format!(
                    "listing rooms timed out after {}s",
                    self.operation_timeout.as_secs()
                ))));
            }
        };

        tracing::debug!(rooms = rooms.len(), "Fetched rooms");

        for room in &rooms {
            result.rooms_scanned += 1;

            let age = room.age_at(now);
            if age < self.age_threshold {
                match self.policy {
                    YoungRoomPolicy::Stop => {
                        tracing::debug!(
                            room_id = %room.multichannel_room_id,
                            age_secs = age.num_seconds(),
                            "Room below age threshold, ending tick"
                        );
                        result.stopped_early = true;
                        break;
                    }
                    YoungRoomPolicy::Skip => {
                        result.young_rooms_skipped += 1;
                        continue;
                    }
                }
            }

            self.process_room(room, &mut result).await;
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn process_room(&self, room: &Room, result: &mut RoomResolverRunResult) {
        let room_id = room.multichannel_room_id.as_str();

        match tokio::time::timeout(self.operation_timeout, self.omnichannel.resolve_room(room_id))
            .await
        {
            Ok(Ok(())) => {
                result.rooms_resolved += 1;
            }
            Ok(Err(e)) => {
                result.resolve_failures += 1;
                self.log_resolve_failure(room_id, &e);
                return;
            }
            Err(_) => {
                result.resolve_failures += 1;
                tracing::warn!(
                    room_id = %room_id,
                    timeout_secs = self.operation_timeout.as_secs(),
                    "Timed out resolving room"
                );
                return;
            }
        }

        let filter = RoomFilter::by_multichannel_room_id(room_id);
        match tokio::time::timeout(self.operation_timeout, self.repo.delete_by(&filter)).await {
            Ok(Ok(deleted)) => {
                result.rooms_deleted += deleted;
                tracing::info!(room_id = %room_id, id = room.id, "Resolved room");
            }
            Ok(Err(e)) => {
                result.delete_failures += 1;
                tracing::error!(
                    room_id = %room_id,
                    error = %e,
                    "Room resolved but not deleted; it will be resolved again next tick"
                );
                return;
            }
            Err(_) => {
                result.delete_failures += 1;
                tracing::error!(
                    room_id = %room_id,
                    timeout_secs = self.operation_timeout.as_secs(),
                    "Timed out deleting resolved room"
                );
                return;
            }
        }

        if !self.listing.is_cached() {
            return;
        }
        match tokio::time::timeout(self.operation_timeout, self.listing.invalidate()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                result.invalidation_failures += 1;
                tracing::warn!(room_id = %room_id, error = %e, "Failed to invalidate room listing cache");
            }
            Err(_) => {
                result.invalidation_failures += 1;
                tracing::warn!(room_id = %room_id, "Timed out invalidating room listing cache");
            }
        }
    }

    fn log_resolve_failure(&self, room_id: &str, error: &ClientError) {
        tracing::warn!(
            room_id = %room_id,
            status = error.status().map(|s| s.as_u16()),
            retryable = error.is_retryable(),
            error = %error,
            "Failed to resolve room"
        );
        if let Some(body) = error.raw_body() {
            tracing::debug!(
                room_id = %room_id,
                body = %self.sanitizer.sanitize_json(body.as_bytes()),
                "Upstream error body"
            );
        }
    }

    pub fn is_cached(&self) -> bool {
        self.listing.is_cached()
    }
}

/// Runs the room resolver until `cancel` fires.
///
/// Ticks never overlap: the next one is scheduled `interval_secs` after the
/// previous one finished. A tick in flight when cancellation arrives runs to
/// completion.
pub async fn start_room_resolver_worker(
    resolver: Arc<RoomResolver>,
    config: RoomResolverConfig,
    cancel: CancellationToken,
) {
    if !config.enabled {
        tracing::info!("Room resolver worker disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.interval_secs,
        age_threshold_secs = config.age_threshold_secs,
        young_room_policy = ?config.young_room_policy,
        operation_timeout_secs = config.operation_timeout_secs,
        cached_listing = resolver.is_cached(),
        "Starting room resolver worker"
    );

    let interval = config.interval();

    loop {
        match resolver.run_tick().await {
            Ok(result) => {
                if result.has_activity() {
                    tracing::info!(
                        scanned = result.rooms_scanned,
                        resolved = result.rooms_resolved,
                        deleted = result.rooms_deleted,
                        resolve_failures = result.resolve_failures,
                        delete_failures = result.delete_failures,
                        invalidation_failures = result.invalidation_failures,
                        young_skipped = result.young_rooms_skipped,
                        stopped_early = result.stopped_early,
                        duration_ms = result.duration_ms,
                        "Room resolver tick complete"
                    );
                } else {
                    tracing::debug!(
                        scanned = result.rooms_scanned,
                        duration_ms = result.duration_ms,
                        "Room resolver tick complete, nothing to resolve"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Room resolver tick failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("Room resolver worker stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{
        cache::{Cache, MemoryCache, ROOM_LISTING_KEY},
        config::MemoryCacheConfig,
        tests::fakes::{FailingCache, FakeOmnichannel, FakeRoomRepo},
    };

    fn config(policy: YoungRoomPolicy) -> RoomResolverConfig {
        RoomResolverConfig {
            age_threshold_secs: 600,
            young_room_policy: policy,
            operation_timeout_secs: 5,
            ..Default::default()
        }
    }

    fn minutes_ago(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
        now - chrono::Duration::minutes(minutes)
    }

    struct Harness {
        repo: Arc<FakeRoomRepo>,
        omnichannel: Arc<FakeOmnichannel>,
        resolver: RoomResolver,
    }

    fn harness(policy: YoungRoomPolicy) -> Harness {
        let repo = Arc::new(FakeRoomRepo::default());
        let omnichannel = Arc::new(FakeOmnichannel::default());
        let resolver = RoomResolver::new(
            RoomListing::uncached(repo.clone()),
            repo.clone(),
            omnichannel.clone(),
            &config(policy),
        );
        Harness {
            repo,
            omnichannel,
            resolver,
        }
    }

    #[tokio::test]
    async fn test_young_room_first_stops_whole_tick() {
        let h = harness(YoungRoomPolicy::Stop);
        let now = Utc::now();
        h.repo.insert("young", minutes_ago(now, 1));
        h.repo.insert("old-1", minutes_ago(now, 30));
        h.repo.insert("old-2", minutes_ago(now, 20));

        let result = h.resolver.run_tick_at(now).await.unwrap();

        assert!(result.stopped_early);
        assert_eq!(result.rooms_scanned, 1);
        assert_eq!(result.rooms_resolved, 0);
        assert!(h.omnichannel.resolved().is_empty());
        assert_eq!(h.repo.ids().len(), 3);
    }

    #[tokio::test]
    async fn test_stop_policy_processes_old_rooms_before_first_young() {
        let h = harness(YoungRoomPolicy::Stop);
        let now = Utc::now();
        h.repo.insert("old-1", minutes_ago(now, 30));
        h.repo.insert("old-2", minutes_ago(now, 11));
        h.repo.insert("young", minutes_ago(now, 2));

        let result = h.resolver.run_tick_at(now).await.unwrap();

        assert_eq!(h.omnichannel.resolved(), vec!["old-1", "old-2"]);
        assert_eq!(h.repo.ids(), vec!["young"]);
        assert_eq!(result.rooms_resolved, 2);
        assert_eq!(result.rooms_deleted, 2);
        assert!(result.stopped_early);
    }

    #[tokio::test]
    async fn test_skip_policy_keeps_scanning() {
        let h = harness(YoungRoomPolicy::Skip);
        let now = Utc::now();
        h.repo.insert("young", minutes_ago(now, 1));
        h.repo.insert("old", minutes_ago(now, 30));

        let result = h.resolver.run_tick_at(now).await.unwrap();

        assert_eq!(h.omnichannel.resolved(), vec!["old"]);
        assert_eq!(h.repo.ids(), vec!["young"]);
        assert_eq!(result.young_rooms_skipped, 1);
        assert!(!result.stopped_early);
    }

    #[tokio::test]
    async fn test_room_exactly_at_threshold_is_resolved() {
        let h = harness(YoungRoomPolicy::Stop);
        let now = Utc::now();
        h.repo.insert("edge", minutes_ago(now, 10));

        h.resolver.run_tick_at(now).await.unwrap();
        assert_eq!(h.omnichannel.resolved(), vec!["edge"]);
    }

    #[tokio::test]
    async fn test_resolve_failure_does_not_stop_later_rooms() {
        let h = harness(YoungRoomPolicy::Stop);
        let now = Utc::now();
        h.repo.insert("room-a", minutes_ago(now, 30));
        h.repo.insert("room-b", minutes_ago(now, 20));
        h.omnichannel.fail_resolve("room-a");

        let result = h.resolver.run_tick_at(now).await.unwrap();

        assert_eq!(h.omnichannel.resolved(), vec!["room-a", "room-b"]);
        assert_eq!(h.repo.ids(), vec!["room-a"]);
        assert_eq!(result.resolve_failures, 1);
        assert_eq!(result.rooms_resolved, 1);
        assert_eq!(result.rooms_deleted, 1);
    }

    #[tokio::test]
    async fn test_delete_failure_retains_room_for_next_tick() {
        let h = harness(YoungRoomPolicy::Stop);
        let now = Utc::now();
        h.repo.insert("room-a", minutes_ago(now, 30));
        h.repo.fail_delete("room-a");

        let result = h.resolver.run_tick_at(now).await.unwrap();
        assert_eq!(result.rooms_resolved, 1);
        assert_eq!(result.delete_failures, 1);
        assert_eq!(h.repo.ids(), vec!["room-a"]);

        // Resolved again on the following tick.
        h.resolver.run_tick_at(now).await.unwrap();
        assert_eq!(h.omnichannel.resolved(), vec!["room-a", "room-a"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_tick() {
        let h = harness(YoungRoomPolicy::Stop);
        let now = Utc::now();
        h.repo.insert("room-a", minutes_ago(now, 30));
        h.repo.fail_fetch.store(true, Ordering::SeqCst);

        let result = h.resolver.run_tick_at(now).await;
        assert!(matches!(result, Err(RoomResolverError::Fetch(_))));
        assert!(h.omnichannel.resolved().is_empty());
        assert_eq!(h.repo.ids(), vec!["room-a"]);
    }

    #[tokio::test]
    async fn test_hung_resolve_times_out_and_tick_continues() {
        let repo = Arc::new(FakeRoomRepo::default());
        let omnichannel = Arc::new(FakeOmnichannel::default());
        let mut cfg = config(YoungRoomPolicy::Stop);
        cfg.operation_timeout_secs = 1;
        let resolver = RoomResolver::new(
            RoomListing::uncached(repo.clone()),
            repo.clone(),
            omnichannel.clone(),
            &cfg,
        );

        let now = Utc::now();
        repo.insert("stuck", minutes_ago(now, 30));
        repo.insert("fine", minutes_ago(now, 20));
        omnichannel.hang_resolve("stuck");

        let result = resolver.run_tick_at(now).await.unwrap();
        assert_eq!(result.resolve_failures, 1);
        assert_eq!(result.rooms_deleted, 1);
        assert_eq!(repo.ids(), vec!["stuck"]);
    }

    #[tokio::test]
    async fn test_delete_invalidates_cached_listing() {
        let repo = Arc::new(FakeRoomRepo::default());
        let omnichannel = Arc::new(FakeOmnichannel::default());
        let cache = Arc::new(MemoryCache::new(&MemoryCacheConfig::default()));
        let resolver = RoomResolver::new(
            RoomListing::new(repo.clone(), Some(cache.clone()), Duration::from_secs(600)),
            repo.clone(),
            omnichannel.clone(),
            &config(YoungRoomPolicy::Stop),
        );

        let now = Utc::now();
        repo.insert("room-a", minutes_ago(now, 30));

        let result = resolver.run_tick_at(now).await.unwrap();
        assert_eq!(result.rooms_deleted, 1);
        assert_eq!(result.invalidation_failures, 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get_bytes(ROOM_LISTING_KEY).await.unwrap().is_none());

        // Next tick reads the store and finds nothing to do.
        let result = resolver.run_tick_at(now).await.unwrap();
        assert_eq!(result.rooms_scanned, 0);
        assert_eq!(omnichannel.resolved(), vec!["room-a"]);
    }

    #[tokio::test]
    async fn test_cache_outage_is_not_fatal() {
        let repo = Arc::new(FakeRoomRepo::default());
        let omnichannel = Arc::new(FakeOmnichannel::default());
        let resolver = RoomResolver::new(
            RoomListing::new(repo.clone(), Some(Arc::new(FailingCache)), Duration::from_secs(600)),
            repo.clone(),
            omnichannel,
            &config(YoungRoomPolicy::Stop),
        );

        let now = Utc::now();
        repo.insert("room-a", minutes_ago(now, 30));

        let result = resolver.run_tick_at(now).await.unwrap();
        assert_eq!(result.rooms_deleted, 1);
        assert_eq!(result.invalidation_failures, 1);
        assert!(repo.ids().is_empty());
    }

    #[tokio::test]
    async fn test_worker_exits_on_cancel() {
        let h = harness(YoungRoomPolicy::Stop);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut cfg = config(YoungRoomPolicy::Stop);
        cfg.interval_secs = 3600;

        tokio::time::timeout(
            Duration::from_secs(5),
            start_room_resolver_worker(Arc::new(h.resolver), cfg, cancel),
        )
        .await
        .expect("worker should stop once cancelled");
        assert_eq!(h.repo.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_worker_returns_immediately() {
        let h = harness(YoungRoomPolicy::Stop);
        let cfg = RoomResolverConfig {
            enabled: false,
            ..Default::default()
        };

        start_room_resolver_worker(Arc::new(h.resolver), cfg, CancellationToken::new()).await;
        assert_eq!(h.repo.fetch_calls.load(Ordering::SeqCst), 0);
    }
}
