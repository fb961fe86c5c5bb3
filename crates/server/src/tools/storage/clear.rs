//! storage_remove and storage_clear tool implementations.

use beekon_core::{StorageArea, StorageManager};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::require_key;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageKeyParams {
    pub area: StorageArea,
    pub key: String,
}

/// Parameters for the storage_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageClearParams {
    pub area: StorageArea,
    /// Only remove keys starting with this prefix, e.g. "beekon_".
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageRemoveOutput {
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageClearOutput {
    pub cleared: bool,
}

pub fn remove_impl(storage: &StorageManager, params: StorageKeyParams) -> Result<CallToolResult, McpError> {
    require_key(&params.key)?;
    let removed = storage.remove(params.area, &params.key);
    json_result(&StorageRemoveOutput { removed })
}

pub fn clear_impl(storage: &StorageManager, params: StorageClearParams) -> Result<CallToolResult, McpError> {
    let cleared = storage.clear(params.area, params.prefix.as_deref());
    json_result(&StorageClearOutput { cleared })
}
