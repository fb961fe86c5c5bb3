//! MCP server handler implementation.
//!
//! Routes tool calls to the router and storage implementations.

use std::sync::Arc;

use beekon_core::StorageManager;
use beekon_worker::CacheRouter;
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

use crate::tools::storage::{
    StorageClearParams, StorageGetParams, StorageKeyParams, StorageSetParams, clear_impl, get_impl, remove_impl,
    set_impl, stats_impl,
};
use crate::tools::worker::{
    NotificationClickParams, PushParams, SyncParams, WorkerFetchParams, WorkerMessageParams, click_impl, fetch_impl,
    message_impl, push_impl, sweep_impl, sync_impl,
};

/// State shared by every tool call.
pub struct AppState {
    pub router: Arc<CacheRouter>,
    pub storage: StorageManager,
}

#[derive(Clone)]
pub struct BeekonServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BeekonServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Route a request through the cache router.
    ///
    /// Passed-through requests are fetched directly and reported with the
    /// reason the router declined them.
    #[tool(description = "Route a GET request through the cache router. Returns status, headers, body and whether it came from the network, the cache or a fallback.")]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state.router, params.0).await
    }

    #[tool(description = "Post a control message: {\"type\":\"SKIP_WAITING\"}, {\"type\":\"CLEAR_CACHE\"} or {\"type\":\"CACHE_URLS\",\"urls\":[...]}.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state.router, params.0).await
    }

    #[tool(description = "Evict API cache entries older than the API window now, instead of waiting for the hourly sweep.")]
    async fn worker_sweep(&self) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.state.router).await
    }

    #[tool(description = "Deliver a background sync event with the given tag.")]
    async fn worker_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(params.0)
    }

    #[tool(description = "Render the notification a push payload would show.")]
    async fn worker_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(params.0)
    }

    #[tool(description = "Resolve the URL a notification click opens.")]
    async fn worker_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.state.router, params.0)
    }

    #[tool(description = "Read a stored value. Missing, expired and version-mismatched records read as not found.")]
    async fn storage_get(&self, params: Parameters<StorageGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state.storage, params.0)
    }

    #[tool(description = "Store a JSON value with an optional schema version and lifetime in seconds.")]
    async fn storage_set(&self, params: Parameters<StorageSetParams>) -> Result<CallToolResult, McpError> {
        set_impl(&self.state.storage, params.0)
    }

    #[tool(description = "Remove a stored value.")]
    async fn storage_remove(&self, params: Parameters<StorageKeyParams>) -> Result<CallToolResult, McpError> {
        remove_impl(&self.state.storage, params.0)
    }

    #[tool(description = "Clear a storage area, or only the keys starting with a prefix.")]
    async fn storage_clear(&self, params: Parameters<StorageClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.state.storage, params.0)
    }

    #[tool(description = "Report approximate bytes used and availability of each storage area.")]
    async fn storage_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.state.storage)
    }
}

impl ServerHandler for BeekonServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "beekon-worker".into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let router = crate::tools::worker::test_router().await;
        let storage = StorageManager::in_memory(Arc::new(beekon_core::SystemClock));
        let server = BeekonServer::new(Arc::new(AppState { router, storage }));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "storage_clear",
                "storage_get",
                "storage_remove",
                "storage_set",
                "storage_stats",
                "worker_fetch",
                "worker_message",
                "worker_notification_click",
                "worker_push",
                "worker_sweep",
                "worker_sync",
            ]
        );
    }
}
