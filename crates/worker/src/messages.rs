//! Control messages posted from the page.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use beekon_core::Error;

use crate::config::CacheKind;
use crate::request::{Request, resolve_url};
use crate::router::CacheRouter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    ClearCache,
    CacheUrls { urls: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    SkipWaiting { activated: bool },
    CacheCleared { namespaces: Vec<String> },
    UrlsCached { requested: usize, cached: usize },
}

impl CacheRouter {
    pub async fn handle_message(&self, message: ControlMessage) -> Result<MessageOutcome, Error> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting();
                let activated = match self.activate().await {
                    Ok(_) => true,
                    Err(err) => {
                        tracing::warn!(error = %err, "activation after skip-waiting failed");
                        false
                    }
                };
                Ok(MessageOutcome::SkipWaiting { activated })
            }
            ControlMessage::ClearCache => {
                let mut namespaces = Vec::new();
                for name in self.cache.namespace_names().await? {
                    if self.cache.delete_namespace(&name).await? {
                        namespaces.push(name);
                    }
                }
                tracing::info!(count = namespaces.len(), "caches cleared");
                Ok(MessageOutcome::CacheCleared { namespaces })
            }
            ControlMessage::CacheUrls { urls } => {
                let requested = urls.len();
                let cached = self.prewarm(&urls).await;
                Ok(MessageOutcome::UrlsCached { requested, cached })
            }
        }
    }

    /// Fetch `urls` concurrently into the static namespace. Returns how many
    /// were stored. Unparseable, gated and failing URLs are skipped.
    async fn prewarm(&self, urls: &[String]) -> usize {
        let fetches = urls.iter().map(|raw| async move {
            let url = match resolve_url(&self.config.origin, raw) {
                Ok(url) => url,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping url");
                    return false;
                }
            };
            let request = Request::get(url);
            if let Err(reason) = self.gate.check(&request) {
                tracing::debug!(url = %request.url, %reason, "skipping gated url");
                return false;
            }

            match self.fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    self.store(CacheKind::Static, &request.cache_key(), &response).await;
                    true
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = %response.status, "skipping url");
                    false
                }
                Err(err) => {
                    tracing::debug!(url = %request.url, error = %err, "skipping url");
                    false
                }
            }
        });

        join_all(fetches).await.into_iter().filter(|stored| *stored).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::WorkerState;
    use crate::testing::{ORIGIN, harness};

    #[test]
    fn test_message_wire_format() {
        let msg: ControlMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        assert_eq!(msg, ControlMessage::SkipWaiting);

        let msg: ControlMessage = serde_json::from_str(r#"{"type":"CLEAR_CACHE"}"#).unwrap();
        assert_eq!(msg, ControlMessage::ClearCache);

        let msg: ControlMessage = serde_json::from_str(r#"{"type":"CACHE_URLS","urls":["/a.js"]}"#).unwrap();
        assert_eq!(msg, ControlMessage::CacheUrls { urls: vec!["/a.js".into()] });

        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"RELOAD"}"#).is_err());
    }

    #[tokio::test]
    async fn test_skip_waiting_activates() {
        let h = harness().await;
        let outcome = h.router.handle_message(ControlMessage::SkipWaiting).await.unwrap();
        assert_eq!(outcome, MessageOutcome::SkipWaiting { activated: true });
        let lifecycle = h.router.lifecycle();
        assert!(lifecycle.skip_waiting);
        assert_eq!(lifecycle.state, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_clear_cache_deletes_everything() {
        let h = harness().await;
        let api = format!("{ORIGIN}/api/topics");
        h.fetcher.respond(&api, 200, "application/json", "[]");
        h.router.handle_fetch(&Request::get(crate::testing::url(&api))).await.unwrap();
        h.router.cache().open_namespace("beekon-static-v1").await.unwrap();

        let outcome = h.router.handle_message(ControlMessage::ClearCache).await.unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::CacheCleared { namespaces: vec!["beekon-api-v1".into(), "beekon-static-v1".into()] }
        );
        assert!(h.router.cache().namespace_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_urls_reports_stored_count() {
        let h = harness().await;
        h.fetcher.respond(&format!("{ORIGIN}/assets/a.js"), 200, "text/javascript", "a");
        h.fetcher.respond(&format!("{ORIGIN}/assets/b.css"), 200, "text/css", "b");
        h.fetcher.respond(&format!("{ORIGIN}/assets/c.js"), 500, "text/plain", "boom");

        let urls = vec![
            "/assets/a.js".to_string(),
            format!("{ORIGIN}/assets/b.css"),
            "/assets/c.js".to_string(),
            "/assets/missing.js".to_string(),
            "https://evil.example.com/x.js".to_string(),
        ];
        let outcome = h.router.handle_message(ControlMessage::CacheUrls { urls }).await.unwrap();

        assert_eq!(outcome, MessageOutcome::UrlsCached { requested: 5, cached: 2 });
        assert_eq!(h.router.cache().count_entries("beekon-static-v1").await.unwrap(), 2);
        assert_eq!(h.fetcher.calls_to("https://evil.example.com/x.js"), 0);
    }
}
