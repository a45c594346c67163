//! The two caching strategies.

use super::{OfflineController, Served};
use crate::Error;
use crate::cache::Request;

impl OfflineController {
    /// Fetch first; on a network failure, answer from any partition.
    ///
    /// Only network-layer errors fall back; anything else propagates.
    /// A miss after a failed fetch is an error: there is no offline page.
    pub(super) async fn network_first(&self, request: &Request) -> Result<Served, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_in_background(request, &response);
                }
                Ok(Served::network(response))
            }
            Err(err) if err.is_network() => {
                tracing::debug!(url = %request.url, error = %err, "network failed, falling back to cache");
                match self.storage.match_any(request).await? {
                    Some(response) => Ok(Served::cache(response)),
                    None => Err(Error::CacheMiss(request.cache_url())),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Serve a stored copy if there is one; otherwise fetch and store.
    ///
    /// Network failures propagate: a static asset has no fallback beyond the
    /// lookup already made.
    pub(super) async fn cache_first(&self, request: &Request) -> Result<Served, Error> {
        if let Some(response) = self.storage.match_any(request).await? {
            tracing::trace!(url = %request.url, "cache hit");
            return Ok(Served::cache(response));
        }

        let response = self.network.fetch(request).await?;
        if response.is_cacheable() {
            self.store_in_background(request, &response);
        } else {
            tracing::debug!(
                url = %request.url,
                status = response.status,
                response_type = %response.response_type,
                "response not cacheable"
            );
        }
        Ok(Served::network(response))
    }
}
