//! Cache row key generation.

use sha2::{Digest, Sha256};

/// Compute the row key for a response stored under `namespace`.
///
/// The same URL in two namespaces yields two independent rows.
pub fn compute_entry_key(namespace: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
