use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SaharaConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub crisis: CrisisConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    pub batch_size: usize,
}

/// How parsed messages become memory records.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// One record per message.
    PerMessage,
    /// Overlapping windows of `window_size` messages, advancing by `window_stride`.
    SlidingWindow,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    /// Messages with fewer characters than this are dropped by the parser.
    pub min_body_chars: usize,
    /// Messages with fewer words than this are not indexed as memories.
    pub min_index_words: usize,
    pub chunking: ChunkingStrategy,
    pub window_size: usize,
    pub window_stride: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub browse_limit: usize,
    pub context_snippets: usize,
    pub snippet_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// `"anthropic"` or `"none"`.
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CrisisConfig {
    /// Prefix the safety payload with the persona's primary endearment.
    pub address_by_endearment: bool,
}

impl Default for SaharaConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            ingest: IngestConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            crisis: CrisisConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_sahara_dir()
            .join("sahara.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_sahara_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            batch_size: 128,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_body_chars: 4,
            min_index_words: 3,
            chunking: ChunkingStrategy::PerMessage,
            window_size: 5,
            window_stride: 3,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            browse_limit: 50,
            context_snippets: 3,
            snippet_chars: 200,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            api_key: String::new(),
            base_url: "https://api.anthropic.com/v1".into(),
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 400,
            timeout_secs: 30,
        }
    }
}

impl GenerationConfig {
    /// Generation runs only with a provider selected and a key present.
    pub fn is_enabled(&self) -> bool {
        self.provider != "none" && !self.api_key.trim().is_empty()
    }
}

/// Returns `~/.sahara/`
pub fn default_sahara_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sahara")
}

/// Returns the default config file path: `~/.sahara/config.toml`
pub fn default_config_path() -> PathBuf {
    default_sahara_dir().join("config.toml")
}

impl SaharaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SaharaConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SAHARA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SAHARA_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("SAHARA_EMBEDDING_PROVIDER") {
            self.embedding.provider = val;
        }
        if let Ok(val) = std::env::var("ANTHROPIC_API_KEY") {
            self.generation.api_key = val;
        }
        if let Ok(val) = std::env::var("SAHARA_GENERATION_MODEL") {
            self.generation.model = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SaharaConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.embedding.batch_size, 128);
        assert_eq!(config.ingest.min_body_chars, 4);
        assert_eq!(config.ingest.chunking, ChunkingStrategy::PerMessage);
        assert_eq!(config.retrieval.top_k, 5);
        assert!(config.storage.db_path.ends_with("sahara.db"));
        assert!(!config.crisis.address_by_endearment);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[ingest]
chunking = "sliding_window"

[generation]
provider = "none"
"#;
        let config: SaharaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.ingest.chunking, ChunkingStrategy::SlidingWindow);
        // defaults still apply for unset fields
        assert_eq!(config.ingest.window_size, 5);
        assert_eq!(config.ingest.window_stride, 3);
        assert!(!config.generation.is_enabled());
    }

    #[test]
    fn generation_requires_api_key() {
        let mut config = GenerationConfig::default();
        assert!(!config.is_enabled());
        config.api_key = "sk-test".into();
        assert!(config.is_enabled());
        config.provider = "none".into();
        assert!(!config.is_enabled());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = SaharaConfig::default();
        std::env::set_var("SAHARA_DB", "/tmp/override.db");
        std::env::set_var("SAHARA_LOG_LEVEL", "trace");
        std::env::set_var("SAHARA_EMBEDDING_PROVIDER", "hashing");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.embedding.provider, "hashing");

        // Clean up
        std::env::remove_var("SAHARA_DB");
        std::env::remove_var("SAHARA_LOG_LEVEL");
        std::env::remove_var("SAHARA_EMBEDDING_PROVIDER");
    }
}
