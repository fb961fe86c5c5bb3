//! worker_sync, worker_push and worker_notification_click tools.

use beekon_worker::{CacheRouter, Notification, handle_sync, notification_click, render_push};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutput {
    pub tag: String,
    pub recognised: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push payload, normally a JSON object with title, body, icon and data.
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// The notification's data; `data.url` is the page to open.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickOutput {
    pub url: String,
}

pub fn sync_impl(params: SyncParams) -> Result<CallToolResult, McpError> {
    let recognised = handle_sync(&params.tag);
    json_result(&SyncOutput { tag: params.tag, recognised })
}

pub fn push_impl(params: PushParams) -> Result<CallToolResult, McpError> {
    json_result(&render_push(params.payload.as_deref()))
}

pub fn click_impl(router: &CacheRouter, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let notification = Notification { data: params.data, ..render_push(None) };
    let url = notification_click(&router.config().origin, &notification);
    json_result(&NotificationClickOutput { url: url.into() })
}
