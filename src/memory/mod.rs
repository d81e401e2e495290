//! MemoryIndex: session-scoped semantic memory over SQLite + sqlite-vec.
//!
//! Text and metadata live in `memory_records`; vectors live in the `memory_vec`
//! vec0 table, partitioned by session so KNN never crosses sessions. All
//! functions here are synchronous and take a borrowed [`rusqlite::Connection`];
//! async callers run them under `spawn_blocking`.

pub mod forget;
pub mod search;
pub mod stats;
pub mod store;

use serde::Serialize;

pub use forget::delete_session_records;
pub use search::{browse, retrieve};
pub use stats::{count_records, count_vectors};
pub use store::{embed_chunks, existing_ids, ingest, insert_chunks, plan_chunks, IngestReport};

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            std::mem::size_of_val(embedding),
        )
    }
}

/// A chunk of chat text ready to embed. Ids are deterministic per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryChunk {
    pub id: String,
    pub seq: usize,
    pub text: String,
    pub sender: String,
    pub date: String,
}

/// A stored memory as returned by retrieval and browse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedMemory {
    pub id: String,
    pub text: String,
    pub sender: String,
    pub date: String,
    /// Cosine similarity (`1 - distance`). `None` when listed without a query.
    pub score: Option<f64>,
}
