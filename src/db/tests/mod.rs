//! Shared room store tests
//!
//! The same test functions run against both backends:
//!
//! - **SQLite**: in-memory databases, run with every `cargo test`
//! - **PostgreSQL**: testcontainers, run with `cargo test -- --ignored`

mod rooms;
