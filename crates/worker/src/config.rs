//! Router configuration: namespaces, windows, precache manifest, gate.

use std::time::Duration;

use url::Url;

use beekon_core::{AppConfig, Error};

use crate::gate::{HostAllowList, RequestGate, is_local_host};
use crate::request::resolve_url;

/// Shell files fetched on install.
pub const PRECACHE_MANIFEST: &[&str] = &["/", "/manifest.json", "/favicon.ico", "/icon-192.png", "/icon-512.png"];

/// The three cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Static,
    Api,
    Image,
}

impl CacheKind {
    fn label(self) -> &'static str {
        match self {
            CacheKind::Static => "static",
            CacheKind::Api => "api",
            CacheKind::Image => "images",
        }
    }
}

/// A named partition and its staleness window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub max_age: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    pub static_assets: Namespace,
    pub api: Namespace,
    pub images: Namespace,
}

impl Namespaces {
    /// `beekon-<kind>-<version>` names with the given windows.
    pub fn new(version: &str, static_ttl: Duration, api_ttl: Duration, image_ttl: Duration) -> Self {
        let make = |kind: CacheKind, max_age| Namespace { name: format!("beekon-{}-{version}", kind.label()), max_age };
        Self {
            static_assets: make(CacheKind::Static, static_ttl),
            api: make(CacheKind::Api, api_ttl),
            images: make(CacheKind::Image, image_ttl),
        }
    }

    pub fn get(&self, kind: CacheKind) -> &Namespace {
        match kind {
            CacheKind::Static => &self.static_assets,
            CacheKind::Api => &self.api,
            CacheKind::Image => &self.images,
        }
    }

    /// Whether `name` is one of the current namespace names.
    pub fn is_current(&self, name: &str) -> bool {
        [&self.static_assets, &self.api, &self.images]
            .iter()
            .any(|ns| ns.name == name)
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::new(
            "v1",
            Duration::from_secs(24 * 60 * 60),
            Duration::from_secs(5 * 60),
            Duration::from_secs(7 * 24 * 60 * 60),
        )
    }
}

/// Everything the router needs to know, fixed at construction.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub origin: Url,
    pub namespaces: Namespaces,
    pub precache: Vec<Url>,
    pub allowed_hosts: Vec<String>,
    pub development: bool,
}

impl RouterConfig {
    /// Defaults for `origin`: standard namespaces, the shell manifest,
    /// the default allow-list and development detected from the origin.
    pub fn for_origin(origin: Url) -> Self {
        Self::build(origin, Namespaces::default(), &AppConfig::default().effective_allowed_hosts(), None)
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let namespaces =
            Namespaces::new(&config.cache_version, config.static_ttl(), config.api_ttl(), config.image_ttl());
        Ok(Self::build(origin, namespaces, &config.effective_allowed_hosts(), config.development))
    }

    fn build(origin: Url, namespaces: Namespaces, hosts: &[String], development: Option<bool>) -> Self {
        let precache = PRECACHE_MANIFEST
            .iter()
            .filter_map(|path| resolve_url(&origin, path).ok())
            .collect();

        let mut allowed_hosts = hosts.to_vec();
        if let Some(host) = origin.host_str() {
            allowed_hosts.push(host.to_ascii_lowercase());
        }

        let development = development.unwrap_or_else(|| origin.host().is_some_and(|host| is_local_host(&host)));

        Self { origin, namespaces, precache, allowed_hosts, development }
    }

    /// URL of the root document.
    pub fn root_url(&self) -> Url {
        let mut root = self.origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        root
    }

    pub fn gate(&self) -> RequestGate {
        RequestGate::new(HostAllowList::new(&self.allowed_hosts), self.development)
    }
}
