//! cache_get tool implementation.
//!
//! Retrieves the stored response for a GET of a URL.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelf_client::resolve;
use shelf_core::{Error, OfflineController, Request, ResponseType};

use crate::tools::body_preview;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Site path or absolute URL.
    pub url: String,

    /// Partition to look in. Defaults to the first partition, in creation
    /// order, holding a match.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Partition the response was found in.
    pub partition: String,
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: BTreeMap<String, String>,
    /// Body as text (lossy UTF-8, first 64 KiB).
    pub body: String,
    pub body_truncated: bool,
    pub bytes: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(controller: &OfflineController, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(controller.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::get(url);
    let storage = controller.storage();

    let candidates = match params.partition {
        Some(name) => vec![name],
        None => storage.keys().await?,
    };

    for partition in candidates {
        let Some(response) = storage.match_in(&partition, &request).await? else {
            continue;
        };

        let (body, body_truncated) = body_preview(&response.body);
        let output = CacheGetOutput {
            partition,
            url: response.url.to_string(),
            status: response.status,
            response_type: response.response_type,
            bytes: response.body.len(),
            headers: response.headers,
            body,
            body_truncated,
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

        return Ok(CallToolResult::success(vec![Content::text(json)]));
    }

    Err(Error::CacheMiss(request.cache_url()).into())
}
