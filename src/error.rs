//! Domain error kinds surfaced by the pipeline.
//!
//! Only [`SaharaError::Parse`] and [`SaharaError::SessionNotFound`] ever reach a
//! caller as a rejected request during a conversation. [`SaharaError::Service`]
//! is produced by the embedding/vector/generation collaborators; the ask flow
//! absorbs it (empty memories, template reply) while ingest and browse report it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaharaError {
    /// Nothing survived parsing and filtering.
    #[error("no messages found")]
    Parse,

    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// An external collaborator (embedder, vector store, generator) failed.
    #[error("service error: {0}")]
    Service(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SaharaError {
    pub fn service(err: impl std::fmt::Display) -> Self {
        Self::Service(err.to_string())
    }
}

pub type Result<T, E = SaharaError> = std::result::Result<T, E>;
