//! The cache router: gate, classify, dispatch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use beekon_core::{CacheDb, Clock, Error};

use crate::classify::{RequestClass, classify};
use crate::config::{CacheKind, RouterConfig};
use crate::fetcher::Fetcher;
use crate::gate::{GateError, RequestGate};
use crate::lifecycle::Lifecycle;
use crate::request::{Request, Response};

/// What the router decided to do with a request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not eligible for caching; the host should fetch it directly.
    PassThrough(GateError),
    /// The router produced a response.
    Respond(Response),
}

/// Intercepts requests and applies per-class caching strategies.
///
/// All state lives on the instance. Share it behind an `Arc`.
pub struct CacheRouter {
    pub(crate) config: RouterConfig,
    pub(crate) gate: RequestGate,
    pub(crate) cache: CacheDb,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for CacheRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRouter")
            .field("origin", &self.config.origin.as_str())
            .field("development", &self.config.development)
            .finish_non_exhaustive()
    }
}

impl CacheRouter {
    pub fn new(config: RouterConfig, cache: CacheDb, fetcher: Arc<dyn Fetcher>, clock: Arc<dyn Clock>) -> Self {
        let gate = config.gate();
        Self { config, gate, cache, fetcher, clock, lifecycle: Mutex::new(Lifecycle::default()) }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn lifecycle_mut(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle_mut().clone()
    }

    /// Route one intercepted request.
    ///
    /// Returns `Err` only for static (non-navigation) and image requests that
    /// failed on the network with nothing in the cache. Every other failure
    /// has a fallback response.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Err(reason) = self.gate.check(request) {
            tracing::debug!(url = %request.url, %reason, "request passed through");
            return Ok(FetchOutcome::PassThrough(reason));
        }

        let response = match classify(&request.url) {
            RequestClass::Static => self.cache_first(request, CacheKind::Static).await?,
            RequestClass::Api => self.network_first_api(request).await,
            RequestClass::Image => self.cache_first(request, CacheKind::Image).await?,
            RequestClass::Navigation => self.network_first_navigation(request).await,
        };

        Ok(FetchOutcome::Respond(response))
    }

    /// Like [`handle_fetch`](Self::handle_fetch), but performs the plain
    /// network fetch for passed-through requests.
    pub async fn respond(&self, request: &Request) -> Result<Response, Error> {
        match self.handle_fetch(request).await? {
            FetchOutcome::Respond(response) => Ok(response),
            FetchOutcome::PassThrough(_) => self.fetch_direct(request).await,
        }
    }

    /// Plain network fetch, bypassing the gate and every cache.
    pub async fn fetch_direct(&self, request: &Request) -> Result<Response, Error> {
        self.fetcher.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestMode, ResponseSource};
    use crate::testing::{ORIGIN, harness, url};
    use reqwest::{Method, StatusCode};

    fn expect_response(outcome: FetchOutcome) -> Response {
        match outcome {
            FetchOutcome::Respond(response) => response,
            FetchOutcome::PassThrough(reason) => panic!("unexpected pass-through: {reason}"),
        }
    }

    #[tokio::test]
    async fn test_static_served_from_cache_within_window() {
        let h = harness().await;
        let asset = format!("{ORIGIN}/assets/index.js");
        h.fetcher.respond(&asset, 200, "text/javascript", "console.log('v1')");

        let first = expect_response(h.router.handle_fetch(&Request::get(url(&asset))).await.unwrap());
        assert_eq!(first.source, ResponseSource::Network);

        h.fetcher.respond(&asset, 200, "text/javascript", "console.log('v2')");
        h.clock.advance(chrono::Duration::hours(23));

        let second = expect_response(h.router.handle_fetch(&Request::get(url(&asset))).await.unwrap());
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.text(), "console.log('v1')");
        assert_eq!(h.fetcher.calls_to(&asset), 1);
    }

    #[tokio::test]
    async fn test_static_refetched_after_window() {
        let h = harness().await;
        let asset = format!("{ORIGIN}/assets/index.js");
        h.fetcher.respond(&asset, 200, "text/javascript", "v1");
        h.router.handle_fetch(&Request::get(url(&asset))).await.unwrap();

        h.fetcher.respond(&asset, 200, "text/javascript", "v2");
        h.clock.advance(chrono::Duration::hours(25));

        let response = expect_response(h.router.handle_fetch(&Request::get(url(&asset))).await.unwrap());
        assert_eq!(response.text(), "v2");
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(h.fetcher.calls_to(&asset), 2);
    }

    #[tokio::test]
    async fn test_static_stale_copy_served_when_offline() {
        let h = harness().await;
        let asset = format!("{ORIGIN}/assets/index.css");
        h.fetcher.respond(&asset, 200, "text/css", "body{}");
        h.router.handle_fetch(&Request::get(url(&asset))).await.unwrap();

        h.clock.advance(chrono::Duration::days(30));
        h.fetcher.set_offline(true);

        let response = expect_response(h.router.handle_fetch(&Request::get(url(&asset))).await.unwrap());
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.text(), "body{}");
    }

    #[tokio::test]
    async fn test_static_miss_offline_propagates_unless_navigation() {
        let h = harness().await;
        h.fetcher.set_offline(true);
        let asset = format!("{ORIGIN}/assets/chunk.js");

        let result = h.router.handle_fetch(&Request::get(url(&asset))).await;
        assert!(matches!(result, Err(Error::Network(_))));

        let navigated = Request::get(url(&asset)).with_mode(RequestMode::Navigate);
        let response = expect_response(h.router.handle_fetch(&navigated).await.unwrap());
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "Offline");
    }

    #[tokio::test]
    async fn test_static_error_status_not_cached() {
        let h = harness().await;
        let asset = format!("{ORIGIN}/assets/missing.js");
        h.fetcher.respond(&asset, 404, "text/plain", "not found");

        let response = expect_response(h.router.handle_fetch(&Request::get(url(&asset))).await.unwrap());
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(h.router.cache().get_entry("beekon-static-v1", &asset).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_api_success_always_overwrites_cache() {
        let h = harness().await;
        let api = format!("{ORIGIN}/api/dashboard/metrics");
        h.fetcher.respond(&api, 200, "application/json", r#"{"score":42}"#);
        h.router.handle_fetch(&Request::get(url(&api))).await.unwrap();

        h.fetcher.respond(&api, 200, "application/json", r#"{"score":43}"#);
        let response = expect_response(h.router.handle_fetch(&Request::get(url(&api))).await.unwrap());
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.text(), r#"{"score":43}"#);

        let stored = h.router.cache().get_entry("beekon-api-v1", &api).await.unwrap().unwrap();
        assert_eq!(stored.body, br#"{"score":43}"#.to_vec());
        assert_eq!(h.fetcher.calls_to(&api), 2);
    }

    #[tokio::test]
    async fn test_api_offline_fallback_respects_window() {
        let h = harness().await;
        let api = format!("{ORIGIN}/api/dashboard/metrics");
        h.fetcher.respond(&api, 200, "application/json", r#"{"score":42}"#);
        h.router.handle_fetch(&Request::get(url(&api))).await.unwrap();

        h.fetcher.set_offline(true);
        h.clock.advance(chrono::Duration::minutes(4));
        let cached = expect_response(h.router.handle_fetch(&Request::get(url(&api))).await.unwrap());
        assert_eq!(cached.source, ResponseSource::Cache);
        assert_eq!(cached.text(), r#"{"score":42}"#);

        h.clock.advance(chrono::Duration::minutes(2));
        let failed = expect_response(h.router.handle_fetch(&Request::get(url(&api))).await.unwrap());
        assert_eq!(failed.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(failed.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&failed.body).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Network error"}));
    }

    #[tokio::test]
    async fn test_api_offline_without_cache_is_503() {
        let api = "https://abc.supabase.co/rest/v1/rpc/get_dashboard_metrics";
        let mut config = RouterConfig::for_origin(url(ORIGIN));
        config.allowed_hosts.push("abc.supabase.co".into());
        let h = crate::testing::harness_with(config).await;
        h.fetcher.set_offline(true);

        let response = expect_response(h.router.handle_fetch(&Request::get(url(api))).await.unwrap());
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_image_cache_first_and_failure_propagates() {
        let h = harness().await;
        let image = format!("{ORIGIN}/avatars/u1.png");
        h.fetcher.respond(&image, 200, "image/png", "PNG");
        h.router.handle_fetch(&Request::get(url(&image))).await.unwrap();

        h.clock.advance(chrono::Duration::days(6));
        let cached = expect_response(h.router.handle_fetch(&Request::get(url(&image))).await.unwrap());
        assert_eq!(cached.source, ResponseSource::Cache);
        assert!(h.router.cache().get_entry("beekon-images-v1", &image).await.unwrap().is_some());

        h.fetcher.set_offline(true);
        let other = format!("{ORIGIN}/avatars/u2.png");
        let navigated = Request::get(url(&other)).with_mode(RequestMode::Navigate);
        assert!(h.router.handle_fetch(&navigated).await.is_err());
    }

    #[tokio::test]
    async fn test_navigation_not_cached_and_offline_page() {
        let h = harness().await;
        let page = format!("{ORIGIN}/dashboard");
        h.fetcher.respond(&page, 200, "text/html", "<html>dashboard</html>");

        let response = expect_response(h.router.handle_fetch(&Request::navigate(url(&page))).await.unwrap());
        assert_eq!(response.source, ResponseSource::Network);
        assert!(h.router.cache().match_any(&page).await.unwrap().is_none());

        h.fetcher.set_offline(true);
        let offline = expect_response(h.router.handle_fetch(&Request::navigate(url(&page))).await.unwrap());
        assert_eq!(offline.status, StatusCode::OK);
        assert_eq!(offline.content_type(), Some("text/html"));
        assert_eq!(offline.text(), "Offline");
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_cached_root() {
        let h = harness().await;
        let root = format!("{ORIGIN}/");
        h.fetcher.respond(&root, 200, "text/html", "<html>shell</html>");
        h.router
            .handle_message(crate::messages::ControlMessage::CacheUrls { urls: vec!["/".into()] })
            .await
            .unwrap();

        h.fetcher.set_offline(true);
        let page = format!("{ORIGIN}/competitors");
        let response = expect_response(h.router.handle_fetch(&Request::navigate(url(&page))).await.unwrap());
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.text(), "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_script_query_never_reaches_a_strategy() {
        let h = harness().await;
        let api = format!("{ORIGIN}/api/search?q=<script>alert(1)</script>");

        let outcome = h.router.handle_fetch(&Request::get(url(&api))).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::PassThrough(GateError::SuspiciousQuery("<script"))));
        assert_eq!(h.fetcher.total_calls(), 0);
        assert_eq!(h.router.cache().count_entries("beekon-api-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let h = harness().await;
        let request = Request::new(Method::POST, url(&format!("{ORIGIN}/api/prompts")));
        let outcome = h.router.handle_fetch(&request).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::PassThrough(GateError::Method(_))));
    }

    #[tokio::test]
    async fn test_respond_fetches_passed_through_requests() {
        let h = harness().await;
        let foreign = "https://analytics.example.com/collect";
        h.fetcher.respond(foreign, 204, "text/plain", "");

        let response = h.router.respond(&Request::get(url(foreign))).await.unwrap();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(h.fetcher.calls_to(foreign), 1);
        assert!(h.router.cache().match_any(foreign).await.unwrap().is_none());
    }
}
