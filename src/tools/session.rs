//! MCP session tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for `get_session` and `delete_session`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SessionParams {
    #[schemars(description = "Session ID returned by ingest_chat")]
    pub session_id: String,
}

/// Parameters for `list_sessions`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListSessionsParams {
    /// Only sessions whose persona name contains this text (case-insensitive).
    #[schemars(description = "Optional filter on the persona name (case-insensitive substring)")]
    pub person: Option<String>,
}
