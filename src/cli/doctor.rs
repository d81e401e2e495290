//! CLI `doctor` command: database and model diagnostics.

use anyhow::{Context, Result};

use sahara::config::SaharaConfig;
use sahara::db;
use sahara::embedding::local::model_paths;

/// Run diagnostics and print a health report.
pub fn doctor(config: &SaharaConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("Sahara Health Report");
    println!("====================");
    println!();
    print_models(config);
    println!();
    println!(
        "Generation:        {}",
        if config.generation.is_enabled() {
            format!("{} ({})", config.generation.provider, config.generation.model)
        } else {
            "disabled (template replies)".to_string()
        }
    );
    println!();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `sahara ingest <file>` or `sahara serve` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!(
        "Indexed with:      {}",
        report.embedding_model.as_deref().unwrap_or("(not set)")
    );
    println!();
    println!("Row counts:");
    println!("  Sessions:        {}", report.session_count);
    println!("  Memories:        {}", report.record_count);
    println!("  Vectors:         {}", report.vector_count);
    if report.record_count != report.vector_count {
        println!("  WARNING: memory and vector counts differ.");
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: restore {} from a backup, or delete it and re-ingest your chats.", db_path.display());
    }

    Ok(())
}

fn print_models(config: &SaharaConfig) {
    println!("Embedding provider: {}", config.embedding.provider);
    if config.embedding.provider != "local" {
        return;
    }
    let (model, tokenizer) = model_paths(&config.embedding);
    for (label, path) in [("Model", model), ("Tokenizer", tokenizer)] {
        let status = if path.exists() { "ok" } else { "MISSING (run `sahara model download`)" };
        println!("  {label:<17}{} [{status}]", path.display());
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
