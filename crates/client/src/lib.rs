//! Client code for missal.
//!
//! This crate provides the document fetcher, fragment extraction,
//! normalization and the refresh orchestrator the server wraps.

pub mod extract;
pub mod fetch;
pub mod refresh;

pub use extract::{
    ExtractError, Fragment, NormalizationWarning, Normalized, extract, normalize, normalize_with_warnings,
    validate_sources,
};
pub use fetch::{Document, FetchClient, FetchConfig, FetchError, FetchRequest, Fetcher};
pub use refresh::{ContentService, Origin, Served};
