//! Lotto DK: Danish lottery jackpot poller
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod scrape;
pub mod engine;
pub mod ha;
pub mod sensors;
pub mod dashboard;
