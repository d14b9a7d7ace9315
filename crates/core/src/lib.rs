//! Core types and shared functionality for missal.
//!
//! This crate provides:
//! - Content values, cache entries and the staleness policy
//! - Cache stores (SQLite, JSON file, in-memory)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod freshness;

pub use cache::{CacheDb, CacheStore, JsonFileStore, MemoryStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{CacheEntry, ContentKey, ContentValue};
pub use error::{Error, ErrorClass};
pub use freshness::{StalenessRule, is_stale};
