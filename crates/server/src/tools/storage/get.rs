//! storage_get and storage_stats tool implementations.

use beekon_core::storage::DEFAULT_VERSION;
use beekon_core::{StorageArea, StorageManager};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::require_key;
use crate::tools::json_result;

/// Parameters for the storage_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageGetParams {
    pub area: StorageArea,
    pub key: String,
    /// Schema version the caller expects (default: 1). Records written with
    /// another version are discarded.
    #[serde(default)]
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageGetOutput {
    pub key: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

pub fn get_impl(storage: &StorageManager, params: StorageGetParams) -> Result<CallToolResult, McpError> {
    require_key(&params.key)?;

    let value: Option<serde_json::Value> =
        storage.get(params.area, &params.key, params.version.unwrap_or(DEFAULT_VERSION));
    json_result(&StorageGetOutput { key: params.key, found: value.is_some(), value })
}

pub fn stats_impl(storage: &StorageManager) -> Result<CallToolResult, McpError> {
    json_result(&storage.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_json;
    use beekon_core::storage::SetOptions;
    use beekon_core::{ManualClock, SystemClock};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_get_found_and_missing() {
        let storage = StorageManager::in_memory(Arc::new(SystemClock));
        storage.set(StorageArea::Durable, "beekon_user_preferences", &json!({"theme": "dark"}), SetOptions::default());

        let params = StorageGetParams { area: StorageArea::Durable, key: "beekon_user_preferences".into(), version: None };
        let output = result_json(&get_impl(&storage, params).unwrap());
        assert_eq!(output, json!({"key": "beekon_user_preferences", "found": true, "value": {"theme": "dark"}}));

        let params = StorageGetParams { area: StorageArea::Session, key: "beekon_user_preferences".into(), version: None };
        let output = result_json(&get_impl(&storage, params).unwrap());
        assert_eq!(output, json!({"key": "beekon_user_preferences", "found": false}));
    }

    #[test]
    fn test_get_version_mismatch_reads_as_missing() {
        let storage = StorageManager::in_memory(Arc::new(ManualClock::starting_now()));
        storage.set(StorageArea::Durable, "beekon_user_preferences", &json!({"theme": "dark"}), SetOptions::version(1));

        let params = StorageGetParams { area: StorageArea::Durable, key: "beekon_user_preferences".into(), version: Some(2) };
        let output = result_json(&get_impl(&storage, params).unwrap());
        assert_eq!(output["found"], json!(false));
    }

    #[test]
    fn test_get_empty_key_rejected() {
        let storage = StorageManager::in_memory(Arc::new(SystemClock));
        let params = StorageGetParams { area: StorageArea::Durable, key: String::new(), version: None };
        assert!(get_impl(&storage, params).is_err());
    }

    #[test]
    fn test_stats() {
        let storage = StorageManager::in_memory(Arc::new(SystemClock));
        let output = result_json(&stats_impl(&storage).unwrap());
        assert_eq!(output["durable_available"], json!(true));
        assert_eq!(output["session_available"], json!(true));
    }
}
