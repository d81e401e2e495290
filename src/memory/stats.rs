//! Record and vector counts.

use anyhow::Result;
use rusqlite::{params, Connection};

/// Number of memory records stored for a session.
pub fn count_records(conn: &Connection, session_id: &str) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memory_records WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

/// Number of vectors in the index across all sessions.
pub fn count_vectors(conn: &Connection) -> Result<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM memory_vec", [], |row| row.get(0))?;
    Ok(n as usize)
}
