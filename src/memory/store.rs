//! Write path: chunk planning, batched embedding and storage.
//!
//! Ingestion is split so the caller can embed outside the database lock:
//! [`plan_chunks`] → [`existing_ids`] → [`embed_chunks`] → [`insert_chunks`].
//! [`ingest`] runs all four in sequence for synchronous callers.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

use super::{embedding_to_bytes, MemoryChunk};
use crate::config::{ChunkingStrategy, IngestConfig};
use crate::embedding::EmbeddingProvider;
use crate::parser::Message;

/// Outcome of one ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Chunks planned from the messages.
    pub planned: usize,
    /// Chunks newly stored.
    pub added: usize,
    /// Chunks whose id already existed in the session.
    pub skipped: usize,
}

/// Turn messages into chunks with deterministic ids.
///
/// Per-message chunks skip bodies with fewer than `min_index_words` words and
/// are numbered over the kept messages (`{session}_{i}`). Sliding windows
/// (`{session}_w{i}`) apply no word filter, since a short reply still reads as
/// context inside its window, and stop at the first window reaching the last
/// message.
pub fn plan_chunks(session_id: &str, messages: &[Message], config: &IngestConfig) -> Vec<MemoryChunk> {
    match config.chunking {
        ChunkingStrategy::PerMessage => messages
            .iter()
            .filter(|m| m.word_count() >= config.min_index_words)
            .enumerate()
            .map(|(i, m)| MemoryChunk {
                id: format!("{session_id}_{i}"),
                seq: i,
                text: m.body.clone(),
                sender: m.sender.clone(),
                date: m.timestamp.date.clone(),
            })
            .collect(),
        ChunkingStrategy::SlidingWindow => {
            let size = config.window_size.max(1);
            let stride = config.window_stride.max(1);
            let mut chunks = Vec::new();
            let mut start = 0;
            while start < messages.len() {
                let end = (start + size).min(messages.len());
                chunks.push(window_chunk(session_id, chunks.len(), &messages[start..end]));
                if end == messages.len() {
                    break;
                }
                start += stride;
            }
            chunks
        }
    }
}

fn window_chunk(session_id: &str, index: usize, window: &[Message]) -> MemoryChunk {
    let text = window
        .iter()
        .map(|m| format!("[{}] {}: {}", m.timestamp.date, m.sender, m.body))
        .collect::<Vec<_>>()
        .join("\n");

    let mut senders: Vec<&str> = Vec::new();
    for m in window {
        if !senders.contains(&m.sender.as_str()) {
            senders.push(&m.sender);
        }
    }

    MemoryChunk {
        id: format!("{session_id}_w{index}"),
        seq: index,
        text,
        sender: senders.join(", "),
        date: window.first().map(|m| m.timestamp.date.clone()).unwrap_or_default(),
    }
}

/// Ids already stored for a session.
pub fn existing_ids(conn: &Connection, session_id: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT id FROM memory_records WHERE session_id = ?1")?;
    let ids = stmt
        .query_map(params![session_id], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}

/// Embed chunk texts in batches of `batch_size`, preserving order.
pub fn embed_chunks(
    embedder: &dyn EmbeddingProvider,
    chunks: &[MemoryChunk],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let vectors = embedder.encode(&texts).context("embedding batch failed")?;
        anyhow::ensure!(
            vectors.len() == batch.len(),
            "embedding provider returned {} vectors for {} texts",
            vectors.len(),
            batch.len()
        );
        embeddings.extend(vectors);
    }
    Ok(embeddings)
}

/// Store chunks and their vectors in one transaction. Ids that already exist
/// are left untouched. Returns the number of chunks added.
pub fn insert_chunks(
    conn: &mut Connection,
    session_id: &str,
    chunks: &[MemoryChunk],
    embeddings: &[Vec<f32>],
) -> Result<usize> {
    anyhow::ensure!(
        chunks.len() == embeddings.len(),
        "{} chunks but {} embeddings",
        chunks.len(),
        embeddings.len()
    );

    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    let mut added = 0;
    {
        let mut record_stmt = tx.prepare(
            "INSERT OR IGNORE INTO memory_records (id, session_id, seq, text, sender, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut vec_stmt = tx.prepare(
            "INSERT INTO memory_vec (id, session_id, embedding) VALUES (?1, ?2, ?3)",
        )?;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let inserted = record_stmt.execute(params![
                chunk.id,
                session_id,
                chunk.seq as i64,
                chunk.text,
                chunk.sender,
                chunk.date,
                now,
            ])?;
            if inserted == 1 {
                vec_stmt.execute(params![chunk.id, session_id, embedding_to_bytes(embedding)])?;
                added += 1;
            }
        }
    }
    tx.commit()?;
    Ok(added)
}

/// Plan, embed and store `messages` for a session that already has a row.
///
/// Re-ingesting the same messages adds nothing.
pub fn ingest(
    conn: &mut Connection,
    embedder: &dyn EmbeddingProvider,
    session_id: &str,
    messages: &[Message],
    config: &IngestConfig,
    batch_size: usize,
) -> Result<IngestReport> {
    let planned = plan_chunks(session_id, messages, config);
    let existing = existing_ids(conn, session_id)?;
    let fresh: Vec<MemoryChunk> = planned
        .iter()
        .filter(|c| !existing.contains(&c.id))
        .cloned()
        .collect();

    let embeddings = embed_chunks(embedder, &fresh, batch_size)?;
    let added = insert_chunks(conn, session_id, &fresh, &embeddings)?;

    tracing::debug!(session_id, planned = planned.len(), added, "memories ingested");
    Ok(IngestReport {
        planned: planned.len(),
        added,
        skipped: planned.len() - added,
    })
}
