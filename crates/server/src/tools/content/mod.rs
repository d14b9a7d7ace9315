//! Content tools: the client-facing surface over [`missal_client::ContentService`].

pub mod get;
pub mod list;

pub use get::{ContentGetParams, content_get_impl};
pub use list::content_list_impl;
