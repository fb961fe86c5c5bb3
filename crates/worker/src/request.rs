//! Request and response values passed through the router.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

use beekon_core::cache::{CachedResponse, format_http_date};
use beekon_core::Error;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// A top-level document load.
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, mode: RequestMode::default(), headers: HeaderMap::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A GET issued as a document navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// The URL used as cache key: the request URL without its fragment.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built by the router (offline page, 503 body).
    Synthesized,
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Minimal page served when a document can't be loaded at all.
    pub fn offline_page(url: &str) -> Self {
        Self::synthesized(url, StatusCode::OK, "text/html", Bytes::from_static(b"Offline"))
    }

    /// Body returned for API requests with neither network nor a fresh cache.
    pub fn network_error(url: &str) -> Self {
        let body = serde_json::json!({ "error": "Network error" }).to_string();
        Self::synthesized(url, StatusCode::SERVICE_UNAVAILABLE, "application/json", Bytes::from(body))
    }

    fn synthesized(url: &str, status: StatusCode, content_type: &'static str, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { url: url.to_string(), status, headers, body, source: ResponseSource::Synthesized }
    }

    /// Rebuild a response from a cache row.
    ///
    /// Header pairs that are no longer valid are dropped. Returns `None` if
    /// the stored status is not a valid HTTP status.
    pub fn from_cached(entry: &CachedResponse) -> Option<Self> {
        let status = StatusCode::from_u16(entry.status).ok()?;
        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        Some(Self {
            url: entry.url.clone(),
            status,
            headers,
            body: Bytes::from(entry.body.clone()),
            source: ResponseSource::Cache,
        })
    }

    /// Snapshot for storage under `key`.
    ///
    /// Responses without a `Date` header are stamped with `now` so their age
    /// can be computed later.
    pub fn to_cached(&self, key: &str, now: DateTime<Utc>) -> CachedResponse {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        if !self.headers.contains_key(header::DATE) {
            headers.push((header::DATE.as_str().to_string(), format_http_date(now)));
        }

        CachedResponse {
            url: key.to_string(),
            status: self.status.as_u16(),
            headers,
            body: self.body.to_vec(),
            stored_at: now.to_rfc3339(),
        }
    }
}

/// Parse a URL, resolving relative references against `base`.
pub fn resolve_url(base: &Url, input: &str) -> Result<Url, Error> {
    base.join(input.trim()).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
}
