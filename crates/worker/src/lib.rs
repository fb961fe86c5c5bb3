//! Request-intercepting cache router for the Beekon dashboard.
//!
//! The router sees every outgoing request, decides through a security gate
//! whether it may be cached at all, classifies it and applies one of four
//! strategies:
//!
//! | class      | strategy      | window | on network failure                  |
//! |------------|---------------|--------|-------------------------------------|
//! | static     | cache-first   | 24h    | any cached copy, else offline page* |
//! | api        | network-first | 5min   | fresh cached copy, else 503 JSON    |
//! | image      | cache-first   | 7d     | any cached copy, else the error     |
//! | navigation | network-first | -      | cached root document, else offline  |
//!
//! \* only for navigation-mode requests; others get the error.

pub mod classify;
pub mod config;
pub mod events;
pub mod fetcher;
pub mod gate;
pub mod lifecycle;
pub mod messages;
pub mod request;
pub mod router;
pub mod sweep;

mod strategy;

pub use reqwest::{Method, StatusCode};

pub use classify::{RequestClass, classify};
pub use config::{CacheKind, Namespace, Namespaces, RouterConfig};
pub use events::{BACKGROUND_SYNC_TAG, Notification, handle_sync, notification_click, render_push};
pub use fetcher::{FetchConfig, Fetcher, HttpFetcher};
pub use gate::{GateError, RequestGate};
pub use lifecycle::{Lifecycle, WorkerState};
pub use messages::{ControlMessage, MessageOutcome};
pub use request::{Request, RequestMode, Response, ResponseSource};
pub use router::{CacheRouter, FetchOutcome};
pub use sweep::ApiSweeper;

#[cfg(test)]
pub(crate) mod testing;
