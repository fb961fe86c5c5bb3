//! storage_set tool implementation.

use std::time::Duration;

use beekon_core::storage::{DEFAULT_VERSION, SetOptions};
use beekon_core::{StorageArea, StorageManager};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::require_key;
use crate::tools::json_result;

/// Parameters for the storage_set tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageSetParams {
    pub area: StorageArea,
    pub key: String,
    pub value: serde_json::Value,
    /// Schema version to stamp on the record (default: 1).
    #[serde(default)]
    pub version: Option<u32>,
    /// Lifetime in seconds. Without it the record never expires.
    #[serde(default)]
    pub expires_in_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageSetOutput {
    /// False when the area is unavailable or over quota.
    pub stored: bool,
}

pub fn set_impl(storage: &StorageManager, params: StorageSetParams) -> Result<CallToolResult, McpError> {
    require_key(&params.key)?;

    let mut options = SetOptions::version(params.version.unwrap_or(DEFAULT_VERSION));
    if let Some(secs) = params.expires_in_secs {
        options = options.expires_in(Duration::from_secs(secs));
    }

    let stored = storage.set(params.area, &params.key, &params.value, options);
    json_result(&StorageSetOutput { stored })
}
