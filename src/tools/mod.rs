pub mod ask;
pub mod browse_memories;
pub mod ingest_chat;
pub mod session;

use std::sync::Arc;

use ask::AskParams;
use browse_memories::BrowseMemoriesParams;
use ingest_chat::IngestChatParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use sahara::Companion;
use serde::Serialize;
use session::{ListSessionsParams, SessionParams};

/// The Sahara MCP tool handler. Every tool delegates to the shared [`Companion`].
#[derive(Clone)]
pub struct SaharaTools {
    tool_router: ToolRouter<Self>,
    companion: Arc<Companion>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl SaharaTools {
    pub fn new(companion: Arc<Companion>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            companion,
        }
    }

    /// Ingest an exported chat as a new session.
    #[tool(description = "Ingest an exported chat. Infers who the user was talking to and how they wrote, indexes their messages as memories, and returns a session_id.")]
    async fn ingest_chat(
        &self,
        Parameters(params): Parameters<IngestChatParams>,
    ) -> Result<String, String> {
        tracing::info!(text_len = params.export_text.len(), "ingest_chat called");
        let response = self
            .companion
            .ingest_export(&params.export_text)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&response)
    }

    /// Answer a message in the persona's voice.
    #[tool(description = "Send a message to the loved one of a session. The reply uses their voice and real memories. Messages with crisis language get helpline numbers instead; show those to the user.")]
    async fn ask(&self, Parameters(params): Parameters<AskParams>) -> Result<String, String> {
        tracing::info!(session_id = %params.session_id, "ask called");
        let response = self
            .companion
            .ask(&params.session_id, &params.message)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&response)
    }

    #[tool(description = "List memories of a session, ranked by similarity to 'search' or in conversation order.")]
    async fn browse_memories(
        &self,
        Parameters(params): Parameters<BrowseMemoriesParams>,
    ) -> Result<String, String> {
        if params.limit == Some(0) {
            return Err("limit must be at least 1".into());
        }
        let response = self
            .companion
            .browse(&params.session_id, params.search.as_deref(), params.limit)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&response)
    }

    #[tool(description = "Get a session's persona name, message count and memory count.")]
    async fn get_session(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<String, String> {
        let info = self
            .companion
            .session(&params.session_id)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&info)
    }

    #[tool(description = "Delete a session with all of its memories and its persona profile.")]
    async fn delete_session(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<String, String> {
        tracing::info!(session_id = %params.session_id, "delete_session called");
        let response = self
            .companion
            .delete_session(&params.session_id)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&response)
    }

    #[tool(description = "List all sessions, newest first.")]
    async fn list_sessions(
        &self,
        Parameters(params): Parameters<ListSessionsParams>,
    ) -> Result<String, String> {
        let mut sessions = self
            .companion
            .list_sessions()
            .await
            .map_err(|e| e.to_string())?;
        if let Some(person) = params.person.map(|p| p.to_lowercase()) {
            sessions.retain(|s| s.person_name.to_lowercase().contains(&person));
        }
        to_json(&serde_json::json!({ "sessions": sessions, "total": sessions.len() }))
    }
}

#[tool_handler]
impl ServerHandler for SaharaTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Sahara lets a grieving user talk with a loved one's remembered voice. \
                 Use ingest_chat with an exported conversation, then ask with the returned \
                 session_id. If a reply has is_crisis=true, show the helplines prominently."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
