//! Background sync, push and notification click.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::request::resolve_url;

pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

const DEFAULT_TITLE: &str = "Beekon";
const DEFAULT_ICON: &str = "/icon-192.png";

/// Returns whether the tag was recognised. Recognised syncs are currently
/// logged and otherwise ignored.
pub fn handle_sync(tag: &str) -> bool {
    if tag == BACKGROUND_SYNC_TAG {
        tracing::info!(tag, "background sync");
        true
    } else {
        tracing::debug!(tag, "ignoring sync tag");
        false
    }
}

/// A notification to show, rendered from a push payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    data: Option<serde_json::Value>,
}

/// Render the notification for a push payload.
///
/// A payload that isn't a JSON object becomes the notification body.
pub fn render_push(payload: Option<&str>) -> Notification {
    let parsed = match payload {
        None => PushPayload::default(),
        Some(text) => serde_json::from_str::<PushPayload>(text).unwrap_or_else(|_| PushPayload {
            body: Some(text.to_string()),
            ..PushPayload::default()
        }),
    };

    Notification {
        title: parsed.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: parsed.body.unwrap_or_default(),
        icon: parsed.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        badge: DEFAULT_ICON.to_string(),
        data: parsed.data,
    }
}

/// The URL to open when `notification` is clicked: `data.url` resolved
/// against `origin`, or the origin root. Only http(s) targets are opened.
pub fn notification_click(origin: &Url, notification: &Notification) -> Url {
    let target = notification
        .data
        .as_ref()
        .and_then(|data| data.get("url"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("/");

    match resolve_url(origin, target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            tracing::debug!(scheme = url.scheme(), "refusing notification url, opening root");
            origin_root(origin)
        }
        Err(err) => {
            tracing::debug!(error = %err, "bad notification url, opening root");
            origin_root(origin)
        }
    }
}

fn origin_root(origin: &Url) -> Url {
    let mut root = origin.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root
}
