//! A stored record: the response plus what is needed to match it again.

use std::collections::BTreeMap;

use super::request::Request;
use super::response::Response;

/// A response as stored in one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Request key (see [`Request::key`]).
    pub key: String,
    /// Request URL without fragment.
    pub url: String,
    pub method: String,
    /// Request header values for every name in the response's `Vary`;
    /// `None` when the request did not send that header.
    pub vary: BTreeMap<String, Option<String>>,
    pub response: Response,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

impl CachedEntry {
    /// Snapshot `response` as the record for `request`.
    pub fn capture(request: &Request, response: Response) -> Self {
        let vary = response
            .vary()
            .unwrap_or_default()
            .into_iter()
            .map(|name| {
                let value = request.header(&name).map(str::to_string);
                (name, value)
            })
            .collect();

        Self {
            key: request.key(),
            url: request.cache_url(),
            method: request.method.clone(),
            vary,
            response,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether this record answers `request`.
    pub fn matches(&self, request: &Request) -> bool {
        if self.key != request.key() {
            return false;
        }
        if self.response.vary().is_none() {
            return false;
        }
        self.vary
            .iter()
            .all(|(name, value)| request.header(name) == value.as_deref())
    }
}
