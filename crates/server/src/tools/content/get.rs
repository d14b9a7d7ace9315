//! content_get tool implementation.
//!
//! Returns the freshest available value for a key, refreshing it first when
//! the cached entry is stale or missing.

use chrono::SecondsFormat;
use missal_client::{ContentService, Origin};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the content_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentGetParams {
    /// Content key, e.g. "daily_readings" or "saint_of_the_day".
    pub key: String,
}

/// Output from the content_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentGetOutput {
    pub key: String,
    /// Cleaned HTML fragment.
    pub html: String,
    /// Plain-text rendering of `html`.
    pub text: String,
    /// SHA-256 of `html`.
    pub digest: String,
    /// ISO8601 timestamp of when the value was produced.
    pub stored_at: String,
    /// "cache", "fresh" or "stale_fallback".
    #[schemars(with = "String")]
    pub origin: Origin,
}

/// Implementation of the content_get tool.
pub async fn content_get_impl(service: &ContentService, params: ContentGetParams) -> Result<CallToolResult, McpError> {
    let key = params.key.trim();
    if key.is_empty() {
        return Err(missal_core::Error::InvalidInput("key cannot be empty".into()).into());
    }

    let served = service.get(key).await?;

    let output = ContentGetOutput {
        stored_at: served.stored_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        origin: served.origin,
        key: served.key,
        html: served.value.html,
        text: served.value.text,
        digest: served.value.digest,
    };
    json_result(&output)
}
