//! cache_list tool implementation.
//!
//! Lists every partition, marking the ones owned by the running version.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelf_core::{ControllerState, Error, OfflineController};

/// One cache partition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    /// Owned by the running version; stale partitions are evicted on activation.
    pub current: bool,
    /// Stored request URLs, sorted.
    pub urls: Vec<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub state: ControllerState,
    pub precache_name: String,
    pub runtime_name: String,
    /// Partitions in creation order.
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(controller: &OfflineController) -> Result<CallToolResult, McpError> {
    let storage = controller.storage();
    let names = controller.names();

    let mut partitions = Vec::new();
    for name in storage.keys().await? {
        let urls = storage
            .entries(&name)
            .await?
            .into_iter()
            .map(|entry| entry.url)
            .collect();
        partitions.push(PartitionSummary { current: names.contains(&name), name, urls });
    }

    let output = CacheListOutput {
        state: controller.state(),
        precache_name: names.precache.clone(),
        runtime_name: names.runtime.clone(),
        partitions,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
