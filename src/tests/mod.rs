//! Test doubles shared across modules, and end-to-end tests.
