//! MCP `browse_memories` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `browse_memories` MCP tool.
///
/// Without `search`, memories come back in the order they were written.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BrowseMemoriesParams {
    #[schemars(description = "Session ID returned by ingest_chat")]
    pub session_id: String,

    /// Free text to rank memories by similarity.
    #[schemars(description = "Optional text to rank memories by similarity. Omit to list in conversation order.")]
    pub search: Option<String>,

    /// Maximum number of memories. Defaults to 50.
    #[schemars(description = "Maximum number of memories to return. Defaults to 50.")]
    pub limit: Option<usize>,
}
