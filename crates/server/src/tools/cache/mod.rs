//! Cache inspection tools.

pub mod get;

pub use get::{CacheGetParams, cache_get_impl};
