//! Configuration for the email Q&A pipeline
//!
//! Tunables live in a TOML file (created with defaults on first run);
//! API keys come from the environment and are validated before any
//! remote call is made.

use crate::errors::{InboxError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Gmail search query used during ingestion
    pub query: String,
    /// Path to the stored OAuth token (default: ~/.inboxqa/token.json)
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Qdrant gRPC endpoint
    pub url: String,
    /// Collection holding the email vectors
    pub collection: String,
    /// Vector dimension, fixed by the embedding model
    pub dimension: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub embedding: String,
    pub chat: String,
    pub rerank: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest neighbors retrieved from the index
    pub top_k: usize,
    /// Ceiling on candidates kept after re-ranking
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Texts per embedding request
    pub embed_batch_size: usize,
    /// Concurrent per-message detail fetches
    pub fetch_concurrency: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            query: "category:primary".to_string(),
            token_path: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "email-qa".to_string(),
            dimension: 1536,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding: "text-embedding-3-small".to_string(),
            chat: "gpt-4o".to_string(),
            rerank: "rerank-english-v3.0".to_string(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3, top_n: 5 }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            embed_batch_size: 32,
            fetch_concurrency: 8,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating it if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| InboxError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| InboxError::Config(format!("failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.toml"))
    }

    /// Application data directory (~/.inboxqa)
    pub fn app_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| InboxError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".inboxqa"))
    }

    /// Token file path, falling back to ~/.inboxqa/token.json
    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.mail.token_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::app_dir()?.join("token.json")),
        }
    }
}

/// API keys sourced from the environment.
///
/// Required keys are checked at construction so a missing secret fails
/// before any remote call.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub openai_api_key: String,
    pub cohere_api_key: String,
    pub qdrant_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: required_env("OPENAI_API_KEY")?,
            cohere_api_key: required_env("COHERE_API_KEY")?,
            qdrant_api_key: std::env::var("QDRANT_API_KEY").ok(),
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(InboxError::Config(format!("{} is not set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.mail.query, "category:primary");
        assert_eq!(config.index.collection, "email-qa");
        assert_eq!(config.index.dimension, 1536);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.top_n, 5);
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.index.collection = "inbox-test".to_string();
        config.retrieval.top_k = 7;

        let toml_string = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed.index.collection, "inbox-test");
        assert_eq!(parsed.retrieval.top_k, 7);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.models.chat, "gpt-4o");

        // Second load reads the file it just wrote
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.index.url, config.index.url);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.top_n, 5);
        assert_eq!(config.mail.query, "category:primary");
    }

    #[test]
    fn test_required_env_missing() {
        std::env::remove_var("INBOXQA_TEST_MISSING_KEY");
        let result = required_env("INBOXQA_TEST_MISSING_KEY");
        assert!(matches!(result, Err(InboxError::Config(_))));
    }

    #[test]
    fn test_required_env_present() {
        std::env::set_var("INBOXQA_TEST_PRESENT_KEY", "sk-test");
        assert_eq!(required_env("INBOXQA_TEST_PRESENT_KEY").unwrap(), "sk-test");
        std::env::remove_var("INBOXQA_TEST_PRESENT_KEY");
    }
}
