//! Storage manager tools.

pub mod clear;
pub mod get;
pub mod set;

pub use clear::{StorageClearParams, StorageKeyParams, clear_impl, remove_impl};
pub use get::{StorageGetParams, get_impl, stats_impl};
pub use set::{StorageSetParams, set_impl};

use beekon_core::Error;

fn require_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::InvalidInput("key must not be empty".into()));
    }
    Ok(())
}
