//! Forward-only migrations keyed on `schema_meta.schema_version`.
//!
//! A fresh schema is [`CURRENT_SCHEMA_VERSION`]. Each entry in [`STEPS`]
//! lifts a database by one version; the version is bumped after each step.

use rusqlite::{Connection, OptionalExtension};

/// Version the running binary expects after [`run_migrations`].
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

type Step = fn(&Connection) -> rusqlite::Result<()>;

/// `STEPS[i]` upgrades version `i + 1` to `i + 2`. Append only.
const STEPS: &[Step] = &[];

fn read_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// Stored schema version; a missing or garbled value reads as 0.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(read_meta(conn, "schema_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

/// Model id the stored vectors were embedded with. `None` until the first
/// provider is adopted.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    read_meta(conn, "embedding_model")
}

pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    write_meta(conn, "embedding_model", model)
}

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let start = get_schema_version(conn)?;
    if start >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    for version in start.max(1)..CURRENT_SCHEMA_VERSION {
        let Some(step) = STEPS.get((version - 1) as usize) else {
            tracing::error!(version, "no migration step registered");
            break;
        };
        tracing::info!(from = version, to = version + 1, "applying schema migration");
        step(conn)?;
        write_meta(conn, "schema_version", &(version + 1).to_string())?;
    }
    Ok(())
}
