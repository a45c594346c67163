//! Request key generation.

use sha2::{Digest, Sha256};

/// Compute the key a request is stored under within a partition.
///
/// `url` must already have its fragment stripped.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
