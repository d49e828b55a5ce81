//! Observability module providing structured logging.
//!
//! Initializes the global `tracing` subscriber with the configured format
//! and filter directives.

mod tracing_init;

pub use tracing_init::*;
