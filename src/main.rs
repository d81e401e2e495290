mod cli;
mod server;
mod tools;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sahara::config::SaharaConfig;
use sahara::Companion;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sahara", version, about = "Grief companion memory server")]
struct Cli {
    /// Config file (default: ~/.sahara/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio unless --http)
    Serve {
        /// Serve Streamable HTTP at server.host:server.port instead of stdio
        #[arg(long)]
        http: bool,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Ingest an exported chat file as a new session
    Ingest { file: PathBuf },
    /// Send a message to a session's persona
    Ask { session_id: String, message: String },
    /// Browse or search a session's memories
    Memories {
        session_id: String,
        /// Rank by similarity to this text
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show or delete one session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// List all sessions
    Sessions,
    /// Check database, model files and configuration
    Doctor,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.sahara/models/
    Download,
}

#[derive(Subcommand)]
enum SessionAction {
    Show { session_id: String },
    Delete {
        session_id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SaharaConfig::load_from(path)?,
        None => SaharaConfig::load()?,
    };

    // stderr keeps stdout clean for MCP JSON-RPC
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http || config.server.transport == "http" {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Ingest { file } => {
            let companion = Companion::from_config(config)?;
            cli::ingest::ingest(&companion, &file).await?;
        }
        Command::Ask { session_id, message } => {
            let companion = Companion::from_config(config)?;
            cli::ask::ask(&companion, &session_id, &message).await?;
        }
        Command::Memories {
            session_id,
            search,
            limit,
        } => {
            let companion = Companion::from_config(config)?;
            cli::memories::memories(&companion, &session_id, search.as_deref(), limit).await?;
        }
        Command::Session { action } => {
            let companion = Companion::from_config(config)?;
            match action {
                SessionAction::Show { session_id } => {
                    cli::sessions::show(&companion, &session_id).await?
                }
                SessionAction::Delete { session_id, yes } => {
                    cli::sessions::delete(&companion, &session_id, yes).await?
                }
            }
        }
        Command::Sessions => {
            let companion = Companion::from_config(config)?;
            cli::sessions::list(&companion).await?;
        }
    }

    Ok(())
}
