//! Integration tests for DevCrew.
//!
//! Every test works on SQLite files inside a temporary directory.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
