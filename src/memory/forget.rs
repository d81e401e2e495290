//! Session-wide deletion of memory records and their vectors.

use anyhow::Result;
use rusqlite::{params, Connection};

/// Remove every record and vector of `session_id`. Returns the number of
/// records removed; an already-empty session returns 0.
pub fn delete_session_records(conn: &mut Connection, session_id: &str) -> Result<usize> {
    let tx = conn.transaction()?;

    let ids: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM memory_records WHERE session_id = ?1")?;
        let ids = stmt
            .query_map(params![session_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };

    // vec0 deletes by primary key only
    for id in &ids {
        tx.execute("DELETE FROM memory_vec WHERE id = ?1", params![id])?;
    }
    let removed = tx.execute(
        "DELETE FROM memory_records WHERE session_id = ?1",
        params![session_id],
    )?;

    tx.commit()?;
    tracing::debug!(session_id, removed, "session memories deleted");
    Ok(removed)
}
