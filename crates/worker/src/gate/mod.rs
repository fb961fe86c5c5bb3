//! Eligibility gate in front of every caching strategy.
//!
//! Requests that fail any check are passed through to the network untouched
//! and are never written to or served from the cache:
//!
//! - non-GET methods
//! - browser-extension schemes, and anything that isn't http(s)
//! - plain `http` to a host that isn't a local-development host
//! - hostnames outside the allow-list (relaxed to local hosts in development)
//! - `..` in the path, literal or percent-encoded
//! - script-injection markers in the query string

pub mod hosts;
pub mod patterns;

use reqwest::Method;

pub use hosts::{HostAllowList, is_local_host, is_local_ip};
pub use patterns::{INJECTION_MARKERS, find_injection_marker, has_path_traversal};

use crate::request::Request;

/// Schemes used by browser extensions.
pub const EXTENSION_SCHEMES: &[&str] = &[
    "chrome-extension",
    "moz-extension",
    "safari-extension",
    "safari-web-extension",
    "ms-browser-extension",
];

/// Why a request was not eligible for caching.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("method not cached: {0}")]
    Method(Method),

    #[error("browser extension scheme: {0}")]
    ExtensionScheme(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("insecure http to non-local host: {0}")]
    InsecureHost(String),

    #[error("missing host")]
    MissingHost,

    #[error("host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("path traversal in {0}")]
    PathTraversal(String),

    #[error("suspicious query ({0})")]
    SuspiciousQuery(&'static str),
}

/// The allow-list gate.
#[derive(Debug, Clone)]
pub struct RequestGate {
    allowed: HostAllowList,
    development: bool,
}

impl RequestGate {
    pub fn new(allowed: HostAllowList, development: bool) -> Self {
        Self { allowed, development }
    }

    pub fn is_development(&self) -> bool {
        self.development
    }

    /// Check whether `request` may go through a caching strategy.
    pub fn check(&self, request: &Request) -> Result<(), GateError> {
        if request.method != Method::GET {
            return Err(GateError::Method(request.method.clone()));
        }

        let url = &request.url;
        let scheme = url.scheme();
        if EXTENSION_SCHEMES.contains(&scheme) {
            return Err(GateError::ExtensionScheme(scheme.to_string()));
        }
        if scheme != "https" && scheme != "http" {
            return Err(GateError::UnsupportedScheme(scheme.to_string()));
        }

        let host = url.host().ok_or(GateError::MissingHost)?;
        let hostname = url.host_str().unwrap_or_default();
        let local = is_local_host(&host);

        if scheme == "http" && !local {
            return Err(GateError::InsecureHost(hostname.to_string()));
        }

        if !self.allowed.allows(hostname) && !(self.development && local) {
            return Err(GateError::HostNotAllowed(hostname.to_string()));
        }

        if has_path_traversal(url.path()) {
            return Err(GateError::PathTraversal(url.path().to_string()));
        }

        if let Some(marker) = find_injection_marker(url) {
            return Err(GateError::SuspiciousQuery(marker));
        }

        Ok(())
    }
}
