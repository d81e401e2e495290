//! Grief companion memory server: hear a loved one's voice again from their chat history.
//!
//! Sahara ingests an exported chat log, infers how the other person wrote
//! (endearments, emoji, punctuation, recurring phrases), indexes their
//! messages as semantic memories, and answers new messages in their voice.
//! Every question passes a crisis gate first; on a match the reply is a fixed
//! helpline message instead.
//!
//! # Pipeline
//!
//! | Stage | Module |
//! |-------|--------|
//! | Parse export text into messages | [`parser`] |
//! | Infer the persona profile | [`persona`] |
//! | Embed and index memories | [`embedding`], [`memory`] |
//! | Screen for crisis language | [`crisis`] |
//! | Compose the reply | [`synth`] |
//! | Orchestrate ingest / ask / browse / delete | [`companion`] |
//!
//! # Architecture
//!
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec),
//!   vectors partitioned by session
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions), or
//!   a model-free hashing provider
//! - **Generation**: optional Anthropic messages API, with template fallback
//! - **Transport**: MCP over stdio or Streamable HTTP, plus a CLI
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`error`]: domain error kinds
//! - [`session`]: session rows and persisted profiles

pub mod companion;
pub mod config;
pub mod crisis;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod parser;
pub mod persona;
pub mod session;
pub mod synth;

pub use companion::Companion;
pub use error::{Result, SaharaError};
