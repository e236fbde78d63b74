//! Core engine: coordinator, cursor, trigger sources and the per-entry
//! registry.

pub mod coordinator;
pub mod cursor;
pub mod registry;
pub mod trigger;
