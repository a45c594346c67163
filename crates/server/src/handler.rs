//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{CacheGetParams, SiteFetchParams, fetch_impl, get_impl, list_impl};

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
use shelf_core::{Network, OfflineController};

/// The main MCP server handler for shelf-cache.
#[derive(Clone)]
pub struct ShelfServer {
    controller: Arc<OfflineController>,
    network: Arc<dyn Network>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShelfServer {
    /// Create a new server handler.
    ///
    /// `network` answers requests the controller passes through.
    pub fn new(controller: Arc<OfflineController>, network: Arc<dyn Network>) -> Self {
        Self { controller, network, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Request a site path or URL through the offline cache controller. Documents are network-first, other assets cache-first; non-GET and cross-origin requests pass through uncached."
    )]
    async fn site_fetch(&self, params: Parameters<SiteFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.controller, self.network.as_ref(), params.0).await
    }

    #[tool(description = "List cache partitions with the controller state, which partitions are current, and the URLs stored in each.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.controller).await
    }

    #[tool(description = "Get the stored response for a GET of a URL, from one partition or the first partition holding it.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.controller, params.0).await
    }
}

impl ServerHandler for ShelfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shelf-cache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
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
