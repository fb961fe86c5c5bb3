//! worker_message and worker_sweep tool implementations.

use beekon_core::Error;
use beekon_worker::{CacheRouter, ControlMessage};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// The message object, e.g. `{"type": "CACHE_URLS", "urls": ["/assets/app.js"]}`.
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSweepOutput {
    pub evicted: usize,
}

/// Implementation of the worker_message tool.
pub async fn message_impl(router: &CacheRouter, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let message: ControlMessage = serde_json::from_value(params.message)
        .map_err(|e| Error::InvalidInput(format!("unrecognised message: {e}")))?;

    let outcome = router.handle_message(message).await?;
    json_result(&outcome)
}

/// Implementation of the worker_sweep tool.
pub async fn sweep_impl(router: &CacheRouter) -> Result<CallToolResult, McpError> {
    let evicted = router.sweep_api_cache().await?;
    json_result(&WorkerSweepOutput { evicted })
}
