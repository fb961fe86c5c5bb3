//! Core types and shared functionality for the Beekon cache worker.
//!
//! This crate provides:
//! - Response cache with SQLite backend, partitioned into namespaces
//! - Versioned key-value storage manager over durable and session backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod storage;

pub use cache::{CacheDb, CachedResponse};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::Error;
pub use storage::{StorageArea, StorageManager};
