//! MCP `ingest_chat` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `ingest_chat` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IngestChatParams {
    /// Full text of one exported conversation.
    #[schemars(
        description = "Full text of an exported chat (one conversation). Lines look like '[1/2/2023, 9:00:00 PM] Name: text' or '1/2/23, 9:00 PM - Name: text'."
    )]
    pub export_text: String,
}
