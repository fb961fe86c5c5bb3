//! Periodic eviction of stale API entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use beekon_core::Error;

use crate::config::CacheKind;
use crate::router::CacheRouter;

impl CacheRouter {
    /// Evict API entries older than the API window. Returns the number
    /// evicted. Entries without a usable `Date` header are evicted too.
    pub async fn sweep_api_cache(&self) -> Result<usize, Error> {
        let namespace = self.config.namespaces.get(CacheKind::Api);
        let now = self.now();

        let mut evicted = 0;
        for entry in self.cache.list_entries(&namespace.name).await? {
            if entry.is_fresh(now, namespace.max_age) {
                continue;
            }
            if self.cache.delete_entry(&namespace.name, &entry.url).await? {
                evicted += 1;
            }
        }

        tracing::debug!(evicted, namespace = %namespace.name, "api sweep");
        Ok(evicted)
    }
}

/// Background task running [`CacheRouter::sweep_api_cache`] on a fixed period.
///
/// The first sweep happens one period after spawning. Dropping the handle
/// leaves the task running; call [`abort`](Self::abort) to stop it.
#[derive(Debug)]
pub struct ApiSweeper {
    handle: JoinHandle<()>,
}

impl ApiSweeper {
    pub fn spawn(router: Arc<CacheRouter>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let Some(start) = Instant::now().checked_add(period) else {
                tracing::warn!(?period, "sweep period out of range, sweeper not started");
                return;
            };
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = router.sweep_api_cache().await {
                    tracing::warn!(error = %err, "api sweep failed");
                }
            }
        });
        Self { handle }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
