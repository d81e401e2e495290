//! Session rows: conversation metadata plus the persisted persona profile.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::parser::{Message, Timestamp};
use crate::persona::PersonaProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub person_name: String,
    pub created_at: String,
    pub message_count: usize,
}

/// Insert a new session row with its profile.
pub fn create_session(
    conn: &Connection,
    id: &str,
    profile: &PersonaProfile,
    message_count: usize,
) -> Result<Session> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let profile_json = serde_json::to_string(profile).context("failed to serialize profile")?;
    conn.execute(
        "INSERT INTO sessions (id, person_name, created_at, message_count, profile)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, profile.name, created_at, message_count as i64, profile_json],
    )?;
    Ok(Session {
        id: id.to_string(),
        person_name: profile.name.clone(),
        created_at,
        message_count,
    })
}

pub fn get_session(conn: &Connection, id: &str) -> Result<Option<Session>> {
    let session = conn
        .query_row(
            "SELECT id, person_name, created_at, message_count FROM sessions WHERE id = ?1",
            params![id],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

/// All sessions, newest first.
pub fn list_sessions(conn: &Connection) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(
        "SELECT id, person_name, created_at, message_count FROM sessions
         ORDER BY created_at DESC, id DESC",
    )?;
    let sessions = stmt
        .query_map([], row_to_session)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sessions)
}

/// Delete the session row. Returns `false` if it did not exist.
pub fn delete_session(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(n > 0)
}

/// The stored profile, if present and valid.
///
/// A profile that fails to decode or validate is reported as `None` so the
/// caller rebuilds it.
pub fn load_profile(conn: &Connection, id: &str) -> Result<Option<PersonaProfile>> {
    let json: Option<Option<String>> = conn
        .query_row(
            "SELECT profile FROM sessions WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(json) = json.flatten() else {
        return Ok(None);
    };
    match serde_json::from_str::<PersonaProfile>(&json) {
        Ok(profile) => match profile.validate() {
            Ok(()) => Ok(Some(profile)),
            Err(e) => {
                tracing::warn!(session_id = id, error = %e, "stored profile invalid");
                Ok(None)
            }
        },
        Err(e) => {
            tracing::warn!(session_id = id, error = %e, "stored profile unreadable");
            Ok(None)
        }
    }
}

pub fn store_profile(conn: &Connection, id: &str, profile: &PersonaProfile) -> Result<()> {
    let json = serde_json::to_string(profile).context("failed to serialize profile")?;
    conn.execute(
        "UPDATE sessions SET profile = ?1 WHERE id = ?2",
        params![json, id],
    )?;
    Ok(())
}

/// Keep the parsed messages a profile was built from.
pub fn store_messages(conn: &Connection, id: &str, messages: &[Message]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO session_messages (session_id, seq, date, time, sender, body)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut stored = 0;
    for (seq, m) in messages.iter().enumerate() {
        stored += stmt.execute(params![
            id,
            seq as i64,
            m.timestamp.date,
            m.timestamp.time,
            m.sender,
            m.body
        ])?;
    }
    Ok(stored)
}

/// Parsed messages in export order, as stored at ingest.
pub fn load_messages(conn: &Connection, id: &str) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT date, time, sender, body FROM session_messages
         WHERE session_id = ?1 ORDER BY seq",
    )?;
    let messages = stmt
        .query_map(params![id], |row| {
            Ok(Message {
                timestamp: Timestamp {
                    date: row.get(0)?,
                    time: row.get(1)?,
                },
                sender: row.get(2)?,
                body: row.get(3)?,
                session_id: id.to_string(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        person_name: row.get(1)?,
        created_at: row.get(2)?,
        message_count: row.get::<_, i64>(3)? as usize,
    })
}
