//! CLI `ingest` command: load an exported chat file as a new session.

use anyhow::{Context, Result};
use std::path::Path;

use sahara::Companion;

pub async fn ingest(companion: &Companion, path: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let response = companion.ingest_export(&text).await?;

    if response.person_name.is_empty() {
        println!("No other participant found; replies will not use a persona voice.");
    } else {
        println!("Loaded {} memories from {}'s messages.", response.memory_count, response.person_name);
    }
    println!("Session: {}", response.session_id);
    Ok(())
}
