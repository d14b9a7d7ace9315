//! MCP tool implementations.
//!
//! This module contains all tools exposed by the missal server.

pub mod cache;
pub mod content;

pub use cache::{CacheGetParams, cache_get_impl};
pub use content::{ContentGetParams, content_get_impl, content_list_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| missal_core::Error::Internal(format!("failed to serialize tool output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use missal_client::{ContentService, Document, FetchError, FetchRequest, Fetcher};
    use missal_core::config::{NormalizationProfile, SelectorRule, SourceSpec};
    use missal_core::{CacheEntry, ContentValue, ManualClock, MemoryStore, StalenessRule};
    use rmcp::model::CallToolResult;

    pub const PAGE: &str =
        r#"<html><body><div class="entry-content"><h2>Gospel</h2><p>John 3:16</p></div></body></html>"#;

    /// Fetcher that serves a fixed page and counts calls.
    pub struct StaticFetcher {
        pub body: Option<&'static str>,
        pub calls: AtomicUsize,
    }

    impl StaticFetcher {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<Document, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(body) => Ok(Document::from_html(request.url.clone(), body)),
                None => Err(FetchError::HttpStatus { url: request.url.to_string(), status: 502 }),
            }
        }
    }

    pub fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    pub fn entry(key: &str, stored_at: DateTime<Utc>) -> CacheEntry {
        let html = "<p>cached</p>".to_string();
        let digest = missal_core::cache::hash::content_digest(&html);
        CacheEntry::new(key, ContentValue { html, text: "cached".into(), digest }, stored_at)
    }

    fn source(key: &str) -> SourceSpec {
        SourceSpec {
            key: key.into(),
            url: "https://readings.test/readings/".into(),
            query: vec![],
            headers: Default::default(),
            selector: SelectorRule::new("div.entry-content"),
            profile: NormalizationProfile::default(),
            staleness: StalenessRule::DailyRollover,
        }
    }

    pub fn service(body: Option<&'static str>, entries: Vec<CacheEntry>) -> (ContentService, Arc<StaticFetcher>) {
        let fetcher = Arc::new(StaticFetcher { body, calls: AtomicUsize::new(0) });
        let service = ContentService::new(
            vec![source("daily_readings"), source("saint_of_the_day")],
            Arc::new(MemoryStore::with_entries(entries)),
            fetcher.clone(),
            Arc::new(ManualClock::new(noon())),
        );
        (service, fetcher)
    }

    /// Parse the JSON text of a tool result.
    pub fn json(result: &CallToolResult) -> serde_json::Value {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
