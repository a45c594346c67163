//! The network-fetch capability the controller depends on.

use async_trait::async_trait;

use crate::Error;
use crate::cache::{Request, Response};

/// Performs a request against the network.
///
/// HTTP error statuses are ordinary responses. `Err` means the fetch itself
/// failed (offline, DNS, reset, timeout), which is what the document
/// strategy falls back on.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
