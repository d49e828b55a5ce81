//! Room resolver configuration.
//!
//! Controls the background sweep that marks aged rooms as resolved on the
//! platform and stops tracking them locally.
//!
//! # Example
//!
//! ```toml
//! [room_resolver]
//! enabled = true
//! interval_secs = 60
//! age_threshold_secs = 600
//! young_room_policy = "stop"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Room resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomResolverConfig {
    /// Whether the resolver worker runs alongside the server.
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds to wait between the end of one tick and the start of the next.
    /// Default: 60
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Minimum room age before it is resolved.
    /// Default: 600 (10 minutes)
    #[serde(default = "default_age_threshold_secs")]
    pub age_threshold_secs: u64,

    /// What to do on meeting a room younger than the threshold.
    #[serde(default)]
    pub young_room_policy: YoungRoomPolicy,

    /// Upper bound for each platform call and each store or cache operation.
    /// Default: 30
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// TTL of the cached room listing.
    /// Default: 600 (10 minutes)
    #[serde(default = "default_listing_cache_ttl_secs")]
    pub listing_cache_ttl_secs: u64,
}

impl Default for RoomResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            age_threshold_secs: default_age_threshold_secs(),
            young_room_policy: YoungRoomPolicy::default(),
            operation_timeout_secs: default_operation_timeout_secs(),
            listing_cache_ttl_secs: default_listing_cache_ttl_secs(),
        }
    }
}

impl RoomResolverConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn age_threshold(&self) -> Duration {
        Duration::from_secs(self.age_threshold_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn listing_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "room_resolver.interval_secs must be greater than 0".into(),
            ));
        }
        if self.age_threshold_secs == 0 {
            return Err(ConfigError::Validation(
                "room_resolver.age_threshold_secs must be greater than 0".into(),
            ));
        }
        if self.operation_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "room_resolver.operation_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.listing_cache_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "room_resolver.listing_cache_ttl_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Behavior on meeting a room younger than the age threshold.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum YoungRoomPolicy {
    /// End the tick at the first young room. Rooms are listed oldest first,
    /// so everything after it is young too.
    #[default]
    Stop,
    /// Skip young rooms and keep scanning the rest of the listing.
    Skip,
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_age_threshold_secs() -> u64 {
    600
}

fn default_operation_timeout_secs() -> u64 {
    30
}

fn default_listing_cache_ttl_secs() -> u64 {
    600
}
