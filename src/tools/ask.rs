use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    #[schemars(description = "Session ID returned by ingest_chat")]
    pub session_id: String,

    #[schemars(description = "What the user wants to say to their loved one")]
    pub message: String,
}
