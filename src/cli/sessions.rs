//! CLI session commands: list, show and delete.

use anyhow::{bail, Result};
use std::io::Write;

use sahara::Companion;

pub async fn list(companion: &Companion) -> Result<()> {
    let sessions = companion.list_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions. Run `sahara ingest <file>` to create one.");
        return Ok(());
    }

    println!("{:<38} {:<20} {:>8} {:>8}  CREATED", "ID", "PERSON", "MSGS", "MEMS");
    for s in sessions {
        println!(
            "{:<38} {:<20} {:>8} {:>8}  {}",
            s.id, s.person_name, s.message_count, s.memory_count, s.created_at
        );
    }
    Ok(())
}

pub async fn show(companion: &Companion, session_id: &str) -> Result<()> {
    let info = companion.session(session_id).await?;
    println!("Session:   {}", info.id);
    println!("Person:    {}", if info.person_name.is_empty() { "(none)" } else { &info.person_name });
    println!("Created:   {}", info.created_at);
    println!("Messages:  {}", info.message_count);
    println!("Memories:  {}", info.memory_count);
    Ok(())
}

/// Delete a session after confirmation (skipped with `yes`).
pub async fn delete(companion: &Companion, session_id: &str, yes: bool) -> Result<()> {
    if !yes {
        let info = companion.session(session_id).await?;
        println!(
            "This will permanently delete {} memories of {}.",
            info.memory_count, info.person_name
        );
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "YES" {
            bail!("delete cancelled");
        }
    }

    let response = companion.delete_session(session_id).await?;
    if response.deleted {
        println!("Deleted session {} ({} memories).", response.session_id, response.records_removed);
    } else {
        println!("Session {} did not exist.", response.session_id);
    }
    Ok(())
}
