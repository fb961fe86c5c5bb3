//! Tools driving the cache router.

pub mod events;
pub mod fetch;
pub mod message;

pub use events::{NotificationClickParams, PushParams, SyncParams, click_impl, push_impl, sync_impl};
pub use fetch::{WorkerFetchParams, fetch_impl};
pub use message::{WorkerMessageParams, message_impl, sweep_impl};

#[cfg(test)]
pub(crate) async fn test_router() -> std::sync::Arc<beekon_worker::CacheRouter> {
    use beekon_core::{CacheDb, SystemClock};
    use beekon_worker::{CacheRouter, FetchConfig, HttpFetcher, RouterConfig};
    use std::sync::Arc;

    let config = RouterConfig::for_origin(url::Url::parse("https://app.beekon.ai").unwrap());
    let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
    let cache = CacheDb::open_in_memory().await.unwrap();
    Arc::new(CacheRouter::new(config, cache, Arc::new(fetcher), Arc::new(SystemClock)))
}
