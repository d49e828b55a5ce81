//! Background workers.
//!
//! - **Room Resolver**: periodically resolves rooms older than the age
//!   threshold on the omnichannel platform and stops tracking them.
//!
//! Workers follow one pattern: a `start_*_worker` loop that logs its
//! configuration, a `run_tick` doing a single pass, and a result struct
//! summarizing that pass.
//!
//! ```toml
//! [room_resolver]
//! enabled = true
//! interval_secs = 60
//! age_threshold_secs = 600
//! young_room_policy = "stop"
//! ```

mod room_resolver;

pub use room_resolver::{
    RoomResolver, RoomResolverError, RoomResolverRunResult, start_room_resolver_worker,
};
