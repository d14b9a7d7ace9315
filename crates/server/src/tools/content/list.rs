//! content_list tool implementation.

use missal_client::ContentService;
use missal_core::StalenessRule;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentKeyInfo {
    pub key: String,
    /// "daily_rollover", "weekly_rollover" or "max_age".
    pub staleness: String,
    /// Set for "max_age" only.
    pub max_age_seconds: Option<u64>,
}

/// Output from the content_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentListOutput {
    pub keys: Vec<ContentKeyInfo>,
}

/// Implementation of the content_list tool. Lists configured keys, fetched or not.
pub async fn content_list_impl(service: &ContentService) -> Result<CallToolResult, McpError> {
    let keys = service
        .list_keys()
        .into_iter()
        .filter_map(|key| {
            let (staleness, max_age_seconds) = match service.source(&key)?.staleness {
                StalenessRule::DailyRollover => ("daily_rollover", None),
                StalenessRule::WeeklyRollover => ("weekly_rollover", None),
                StalenessRule::MaxAge { seconds } => ("max_age", Some(seconds)),
            };
            Some(ContentKeyInfo { key, staleness: staleness.to_string(), max_age_seconds })
        })
        .collect();

    json_result(&ContentListOutput { keys })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;

    #[tokio::test]
    async fn test_lists_unfetched_keys() {
        let (service, fetcher) = testing::service(None, vec![]);

        let result = content_list_impl(&service).await.unwrap();
        let output = testing::json(&result);
        let keys: Vec<_> = output["keys"].as_array().unwrap().iter().map(|k| k["key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["daily_readings", "saint_of_the_day"]);
        assert_eq!(output["keys"][0]["staleness"], "daily_rollover");
        assert_eq!(fetcher.calls(), 0);
    }
}
