//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shelf-cache server.

pub mod cache;
pub mod site_fetch;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheGetParams, get_impl, list_impl};
pub use site_fetch::{SiteFetchParams, fetch_impl};

/// Bodies longer than this are cut before being returned as text.
pub const MAX_BODY_PREVIEW: usize = 64 * 1024;

/// Render a body as UTF-8 text, lossily, cut to [`MAX_BODY_PREVIEW`] bytes.
///
/// Returns the text and whether it was truncated.
pub(crate) fn body_preview(body: &[u8]) -> (String, bool) {
    let truncated = body.len() > MAX_BODY_PREVIEW;
    let end = body.len().min(MAX_BODY_PREVIEW);
    (String::from_utf8_lossy(&body[..end]).into_owned(), truncated)
}
