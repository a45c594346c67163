//! The persistent blob-store capability.

use async_trait::async_trait;

use super::entry::CachedEntry;
use super::request::Request;
use super::response::Response;
use crate::Error;

/// A set of named partitions, each mapping request keys to stored responses.
///
/// Partitions are listed in creation order; `match_any` searches them in that
/// order and returns the first hit. Writes are last-write-wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Look up `request` in one partition. A missing partition is a miss.
    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Insert or overwrite the record for `request`, creating the partition if needed.
    ///
    /// Only GET requests can be stored.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Names of all partitions, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Every record in a partition.
    async fn entries(&self, name: &str) -> Result<Vec<CachedEntry>, Error>;

    /// Drop a partition and all of its records. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up `request` across all partitions.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        for name in self.keys().await? {
            if let Some(response) = self.match_in(&name, request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Whether a partition with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.keys().await?.iter().any(|k| k == name))
    }
}

/// Reject writes the cache can never serve back.
pub(crate) fn ensure_storable(request: &Request) -> Result<(), Error> {
    if !request.is_get() {
        return Err(Error::InvalidInput(format!("only GET requests can be cached, got {}", request.method)));
    }
    Ok(())
}
