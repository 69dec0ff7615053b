//! DevCrew - an agent crew with guarded SQLite tools.
//!
//! This library exposes the core modules for use in integration tests.

pub mod chat;
pub mod cli;
pub mod config;
pub mod crew;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod safety;
pub mod session;
pub mod tools;
