//! Per-class caching strategies.

use beekon_core::{CachedResponse, Error};

use crate::config::CacheKind;
use crate::request::{Request, RequestMode, Response};
use crate::router::CacheRouter;

/// A cache lookup result with its freshness against the namespace window.
struct Hit {
    response: Response,
    fresh: bool,
}

impl CacheRouter {
    /// Cache-first with network refresh, used for static assets and images.
    ///
    /// A fresh copy is returned without touching the network. Otherwise the
    /// network is tried; 2xx responses are stored. On network failure any
    /// copy is returned regardless of age. Static navigations that find
    /// nothing get the offline page; everything else propagates the error.
    pub(crate) async fn cache_first(&self, request: &Request, kind: CacheKind) -> Result<Response, Error> {
        let key = request.cache_key();
        let cached = match self.lookup(kind, &key).await {
            Some(Hit { response, fresh: true }) => return Ok(response),
            other => other,
        };

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(kind, &key, &response).await;
                }
                Ok(response)
            }
            Err(err) => {
                if let Some(hit) = cached {
                    tracing::debug!(url = %key, error = %err, "network failed, serving stale copy");
                    return Ok(hit.response);
                }
                if kind == CacheKind::Static && request.mode == RequestMode::Navigate {
                    return Ok(Response::offline_page(&key));
                }
                Err(err)
            }
        }
    }

    /// Network-first for API calls. Never fails.
    ///
    /// Successful responses overwrite the cached copy. Non-2xx responses are
    /// returned untouched. Without network, a copy younger than the API
    /// window is served; otherwise a 503 JSON body.
    pub(crate) async fn network_first_api(&self, request: &Request) -> Response {
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(CacheKind::Api, &key, &response).await;
                }
                response
            }
            Err(err) => {
                tracing::debug!(url = %key, error = %err, "api fetch failed");
                match self.lookup(CacheKind::Api, &key).await {
                    Some(Hit { response, fresh: true }) => response,
                    _ => Response::network_error(&key),
                }
            }
        }
    }

    /// Network-first for documents. Documents are never cached; offline
    /// navigations fall back to the cached root document, then the
    /// offline page.
    pub(crate) async fn network_first_navigation(&self, request: &Request) -> Response {
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(url = %key, error = %err, "navigation failed");
                let root = self.config.root_url();
                match self.cache.match_any(root.as_str()).await {
                    Ok(Some(entry)) => Response::from_cached(&entry).unwrap_or_else(|| Response::offline_page(&key)),
                    Ok(None) => Response::offline_page(&key),
                    Err(lookup) => {
                        tracing::warn!(error = %lookup, "root lookup failed");
                        Response::offline_page(&key)
                    }
                }
            }
        }
    }

    /// Look up `key` in the namespace for `kind`. Read errors count as a miss.
    async fn lookup(&self, kind: CacheKind, key: &str) -> Option<Hit> {
        let namespace = self.config.namespaces.get(kind);
        let entry = match self.cache.get_entry(&namespace.name, key).await {
            Ok(entry) => entry?,
            Err(err) => {
                tracing::warn!(namespace = %namespace.name, url = %key, error = %err, "cache read failed");
                return None;
            }
        };

        let fresh = entry.is_fresh(self.now(), namespace.max_age);
        Response::from_cached(&entry).map(|response| Hit { response, fresh })
    }

    /// Write a response into the namespace for `kind`, logging failures.
    pub(crate) async fn store(&self, kind: CacheKind, key: &str, response: &Response) {
        let namespace = &self.config.namespaces.get(kind).name;
        let entry: CachedResponse = response.to_cached(key, self.now());
        if let Err(err) = self.cache.put_entry(namespace, &entry).await {
            tracing::warn!(namespace = %namespace, url = %key, error = %err, "cache write failed");
        }
    }
}
