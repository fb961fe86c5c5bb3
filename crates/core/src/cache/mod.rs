//! SQLite-backed response cache, partitioned into named namespaces.
//!
//! This module is the worker's equivalent of a browser cache storage. It
//! supports:
//!
//! - Named namespaces that can be listed and dropped as a unit
//! - Responses keyed by (namespace, URL), overwritten on every put
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod namespaces;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedResponse, format_http_date, parse_http_date};
