//! Read path: session-scoped KNN retrieval and insertion-ordered browsing.

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{params, Connection};

use super::{embedding_to_bytes, RetrievedMemory};

struct RecordRow {
    text: String,
    sender: String,
    date: String,
}

/// The `k` records of `session_id` nearest to `query_embedding`, best first.
///
/// `k` is clamped to the number of stored records; an empty session yields an
/// empty list without touching the vector index.
pub fn retrieve(
    conn: &Connection,
    session_id: &str,
    query_embedding: &[f32],
    k: usize,
) -> Result<Vec<RetrievedMemory>> {
    let stored = super::count_records(conn, session_id)?;
    let k = k.min(stored);
    if k == 0 {
        return Ok(vec![]);
    }

    let hits = vector_search(conn, session_id, query_embedding, k)?;
    let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
    let mut rows = fetch_records(conn, &ids)?;

    let mut memories: Vec<RetrievedMemory> = hits
        .iter()
        .filter_map(|(id, distance)| {
            let row = rows.remove(id)?;
            Some(RetrievedMemory {
                id: id.clone(),
                text: row.text,
                sender: row.sender,
                date: row.date,
                score: Some(1.0 - distance),
            })
        })
        .collect();

    memories.sort_by(|a, b| {
        b.score
            .unwrap_or(f64::MIN)
            .total_cmp(&a.score.unwrap_or(f64::MIN))
    });
    Ok(memories)
}

/// Up to `limit` records of a session in insertion order, without scores.
pub fn browse(conn: &Connection, session_id: &str, limit: usize) -> Result<Vec<RetrievedMemory>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, sender, date FROM memory_records
         WHERE session_id = ?1 ORDER BY seq LIMIT ?2",
    )?;
    let memories = stmt
        .query_map(params![session_id, limit as i64], |row| {
            Ok(RetrievedMemory {
                id: row.get(0)?,
                text: row.get(1)?,
                sender: row.get(2)?,
                date: row.get(3)?,
                score: None,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(memories)
}

/// KNN via sqlite-vec, restricted to one partition.
fn vector_search(
    conn: &Connection,
    session_id: &str,
    embedding: &[f32],
    k: usize,
) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memory_vec
         WHERE embedding MATCH ?1 AND k = ?2 AND session_id = ?3
         ORDER BY distance",
    )?;
    let results = stmt
        .query_map(
            params![embedding_to_bytes(embedding), k as i64, session_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

fn fetch_records(conn: &Connection, ids: &[&str]) -> Result<HashMap<String, RecordRow>> {
    let mut stmt =
        conn.prepare("SELECT text, sender, date FROM memory_records WHERE id = ?1")?;
    let mut rows = HashMap::with_capacity(ids.len());
    for id in ids {
        let row = stmt.query_row(params![id], |row| {
            Ok(RecordRow {
                text: row.get(0)?,
                sender: row.get(1)?,
                date: row.get(2)?,
            })
        });
        match row {
            Ok(row) => {
                rows.insert(id.to_string(), row);
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                tracing::warn!(id, "vector without record, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(rows)
}
