//! worker_fetch tool implementation.
//!
//! Routes one request through the cache router the way an intercepted page
//! request would be.

use std::collections::BTreeMap;

use beekon_core::Error;
use beekon_worker::request::resolve_url;
use beekon_worker::{CacheRouter, FetchOutcome, Method, Request, RequestMode, ResponseSource};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else passes through uncached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "cors" (default), "no-cors" or "same-origin".
    #[serde(default)]
    pub mode: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    pub source: ResponseSource,
    /// Why the router declined to handle the request, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed_through: Option<String>,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

fn parse_mode(mode: Option<String>) -> Result<RequestMode, Error> {
    match mode {
        None => Ok(RequestMode::default()),
        Some(mode) => serde_json::from_value(serde_json::Value::String(mode.clone()))
            .map_err(|_| Error::InvalidInput(format!("unknown request mode: {mode}"))),
    }
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(router: &CacheRouter, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let mode = parse_mode(params.mode)?;
    let url = resolve_url(&router.config().origin, &params.url)?;
    let request = Request::new(method, url).with_mode(mode);

    let (response, passed_through) = match router.handle_fetch(&request).await? {
        FetchOutcome::Respond(response) => (response, None),
        FetchOutcome::PassThrough(reason) => (router.fetch_direct(&request).await?, Some(reason.to_string())),
    };

    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();

    let output = WorkerFetchOutput {
        url: response.url.clone(),
        status: response.status.as_u16(),
        source: response.source,
        passed_through,
        content_type: response.content_type().map(str::to_string),
        headers,
        body: response.text(),
    };

    json_result(&output)
}
