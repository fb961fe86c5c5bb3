//! Test doubles shared by the router tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use beekon_core::{CacheDb, Error, ManualClock};

use crate::config::RouterConfig;
use crate::fetcher::Fetcher;
use crate::request::{Request, Response, ResponseSource};
use crate::router::CacheRouter;

pub(crate) const ORIGIN: &str = "https://app.beekon.ai";

#[derive(Clone)]
struct Route {
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
}

/// Fetcher answering from a table of canned responses.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl FakeFetcher {
    pub(crate) fn respond(&self, url: &str, status: u16, content_type: &'static str, body: &str) {
        let route = Route {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body: Bytes::from(body.to_string()),
        };
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }

        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("no route for {url}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(route.content_type));
        Ok(Response { url, status: route.status, headers, body: route.body, source: ResponseSource::Network })
    }
}

pub(crate) struct Harness {
    pub router: Arc<CacheRouter>,
    pub fetcher: Arc<FakeFetcher>,
    pub clock: Arc<ManualClock>,
}

pub(crate) async fn harness() -> Harness {
    harness_with(RouterConfig::for_origin(Url::parse(ORIGIN).unwrap())).await
}

pub(crate) async fn harness_with(config: RouterConfig) -> Harness {
    let fetcher = Arc::new(FakeFetcher::default());
    let clock = Arc::new(ManualClock::starting_now());
    let cache = CacheDb::open_in_memory().await.unwrap();
    let router = Arc::new(CacheRouter::new(config, cache, fetcher.clone(), clock.clone()));
    Harness { router, fetcher, clock }
}

pub(crate) fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}
