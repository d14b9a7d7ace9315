//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{CacheGetParams, ContentGetParams, cache_get_impl, content_get_impl, content_list_impl};

use missal_client::ContentService;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for missal.
#[derive(Clone)]
pub struct MissalServer {
    service: ContentService,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl MissalServer {
    /// Create a new server handler over `service`.
    pub fn new(service: ContentService) -> Self {
        Self { service, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Get the current content for a key (daily readings, Sunday homily, saint of the day, ...). Serves the cached copy while it is fresh and refreshes it from the source once it goes stale."
    )]
    async fn content_get(&self, params: Parameters<ContentGetParams>) -> Result<CallToolResult, McpError> {
        content_get_impl(&self.service, params.0).await
    }

    #[tool(description = "List the configured content keys and how often each one changes.")]
    async fn content_list(&self) -> Result<CallToolResult, McpError> {
        content_list_impl(&self.service).await
    }

    /// Inspect the cache without triggering a refresh.
    #[tool(description = "Show the stored entry for a content key without refreshing it. No network requests are made.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache_get_impl(&self.service, params.0).await
    }
}

impl ServerHandler for MissalServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "missal-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Liturgical content by key. Call content_list for the available keys, then content_get.".into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;

    #[test]
    fn test_router_exposes_tools() {
        let (service, _) = testing::service(None, vec![]);
        let server = MissalServer::new(service);

        let mut names: Vec<_> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_get", "content_get", "content_list"]);
    }
}
