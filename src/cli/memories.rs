//! CLI `memories` command: browse or search a session's memories.

use anyhow::Result;

use sahara::Companion;

const PREVIEW_CHARS: usize = 120;

pub async fn memories(
    companion: &Companion,
    session_id: &str,
    search: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let response = companion.browse(session_id, search, limit).await?;

    if response.memories.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    for (i, memory) in response.memories.iter().enumerate() {
        let preview: String = memory.text.chars().take(PREVIEW_CHARS).collect();
        let ellipsis = if memory.text.chars().count() > PREVIEW_CHARS { "..." } else { "" };
        match memory.score {
            Some(score) => println!("  {}. [{}] {} (score: {:.3})", i + 1, memory.date, memory.sender, score),
            None => println!("  {}. [{}] {}", i + 1, memory.date, memory.sender),
        }
        println!("     {}{}", preview.replace('\n', " / "), ellipsis);
        println!();
    }

    Ok(())
}
