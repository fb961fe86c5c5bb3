//! Install and activate.

use futures_util::future::join_all;
use serde::Serialize;

use beekon_core::{CachedResponse, Error};

use crate::config::CacheKind;
use crate::request::Request;
use crate::router::CacheRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker will never control clients.
    Redundant,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Lifecycle {
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

impl CacheRouter {
    /// Precache the shell manifest into the static namespace.
    ///
    /// All-or-nothing: every manifest URL is fetched before anything is
    /// written, a single failure or non-2xx status aborts the install, and
    /// the fetched entries are stored in one transaction.
    pub async fn install(&self) -> Result<(), Error> {
        self.lifecycle_mut().state = WorkerState::Installing;

        let fetches = self.config.precache.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let key = request.cache_key();
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => Ok(response.to_cached(&key, self.now())),
                Ok(response) => Err(format!("{key}: status {}", response.status)),
                Err(err) => Err(format!("{key}: {err}")),
            }
        });

        let results: Result<Vec<CachedResponse>, String> = join_all(fetches).await.into_iter().collect();
        let entries = match results {
            Ok(entries) => entries,
            Err(reason) => {
                self.lifecycle_mut().state = WorkerState::Redundant;
                tracing::error!(%reason, "precache failed");
                return Err(Error::InstallFailed(reason));
            }
        };

        let namespace = &self.config.namespaces.get(CacheKind::Static).name;
        if let Err(err) = self.cache.put_entries(namespace, &entries).await {
            self.lifecycle_mut().state = WorkerState::Redundant;
            tracing::error!(error = %err, "precache write failed");
            return Err(Error::InstallFailed(format!("{namespace}: {err}")));
        }

        tracing::info!(count = entries.len(), namespace = %namespace, "precache complete");
        self.skip_waiting();
        Ok(())
    }

    /// Skip the waiting phase. Moves an installed worker straight on.
    pub fn skip_waiting(&self) {
        let mut lifecycle = self.lifecycle_mut();
        lifecycle.skip_waiting = true;
        if matches!(lifecycle.state, WorkerState::Parsed | WorkerState::Installing) {
            lifecycle.state = WorkerState::Installed;
        }
    }

    /// Delete every namespace that is not current, then claim clients.
    ///
    /// Returns the names of the deleted namespaces.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.lifecycle_mut().state = WorkerState::Activating;

        let mut deleted = Vec::new();
        for name in self.cache.namespace_names().await? {
            if self.config.namespaces.is_current(&name) {
                continue;
            }
            if self.cache.delete_namespace(&name).await? {
                tracing::info!(namespace = %name, "deleted stale namespace");
                deleted.push(name);
            }
        }

        let mut lifecycle = self.lifecycle_mut();
        lifecycle.state = WorkerState::Activated;
        lifecycle.clients_claimed = true;
        Ok(deleted)
    }
}
