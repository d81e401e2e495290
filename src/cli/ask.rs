use anyhow::Result;

use sahara::Companion;

/// Send one message and print the reply.
pub async fn ask(companion: &Companion, session_id: &str, message: &str) -> Result<()> {
    let response = companion.ask(session_id, message).await?;

    if response.is_crisis {
        // helplines are already listed in the reply text
        eprintln!("!! Crisis language detected. Please reach out to someone now.");
        println!("{}", response.reply);
        return Ok(());
    }

    println!("{}", response.reply);
    println!();
    println!("({} memories used)", response.memories_used);
    Ok(())
}
