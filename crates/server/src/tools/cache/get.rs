//! cache_get tool implementation.
//!
//! Shows what the store holds for a key without refreshing it.

use missal_client::ContentService;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The content key to inspect.
    pub key: String,
}

/// A stored entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedEntry {
    pub html: String,
    pub text: String,
    pub digest: String,
    pub stored_at: String,
    /// Whether the next content_get would refresh this entry.
    pub stale: bool,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub key: String,
    /// Absent when the key has never been fetched successfully.
    pub entry: Option<CachedEntry>,
}

/// Implementation of the cache_get tool.
pub async fn cache_get_impl(service: &ContentService, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let key = params.key.trim();
    if key.is_empty() {
        return Err(missal_core::Error::InvalidInput("key cannot be empty".into()).into());
    }

    let entry = service.peek(key).await?.map(|entry| CachedEntry {
        stale: service.is_stale(&entry),
        stored_at: entry.stored_at_rfc3339(),
        html: entry.value.html,
        text: entry.value.text,
        digest: entry.value.digest,
    });

    json_result(&CacheGetOutput { key: key.to_string(), entry })
}
