// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for semdex
//!
//! Loads configuration from .semdexrc.toml in current directory or ~/.config/semdex/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::embedding::provider::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::embedding::{EmptyTextPolicy, DEFAULT_MAX_TOKENS};
use crate::errors::{Result, SearchError};
use crate::indexer::KeyStrategy;
use crate::store::DEFAULT_EMBEDDING_DIM;

/// Project-local configuration file name.
pub const CONFIG_FILE: &str = ".semdexrc.toml";

/// Output format for results (mirrored from cli for library use)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOutputFormat {
    #[default]
    Text,
    Json,
}

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    #[default]
    Openai,
    Command,
    Dummy,
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (openai, command, dummy)
    pub provider: Option<EmbeddingProviderType>,
    /// Model identifier for the embedding provider
    pub model: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: Option<String>,
    /// Command to execute for command provider
    pub command: Option<String>,
    /// Vector dimension declared when an index is created
    pub dimension: Option<usize>,
    /// Maximum segment length in chars per provider call
    pub max_tokens: Option<usize>,
    /// Behaviour for empty text (reject, embed)
    pub empty_text: Option<EmptyTextPolicy>,
    /// Worker threads used to embed documents during a load
    pub concurrency: Option<usize>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Attempts per request, including the first
    pub max_retries: Option<usize>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to OpenAI)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier (defaults to "text-embedding-ada-002")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }

    /// Get vector dimension (defaults to 1536)
    pub fn dimension(&self) -> usize {
        self.dimension.unwrap_or(DEFAULT_EMBEDDING_DIM)
    }

    /// Get max tokens per segment (defaults to 8000)
    pub fn max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Get empty text policy (defaults to Reject)
    pub fn empty_text(&self) -> EmptyTextPolicy {
        self.empty_text.unwrap_or_default()
    }

    /// Get embedding concurrency (defaults to 1, never 0)
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(1).max(1)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(30)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries.unwrap_or(3)
    }
}

/// Index configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Default index name
    pub name: Option<String>,
    /// How document keys are assigned (position, content_hash)
    pub key_strategy: Option<KeyStrategy>,
}

impl IndexConfig {
    /// Get index name (defaults to "sample")
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("sample")
    }

    /// Get key strategy (defaults to Position)
    pub fn key_strategy(&self) -> KeyStrategy {
        self.key_strategy.unwrap_or_default()
    }
}

/// Search configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results to return
    pub top_k: Option<usize>,
}

impl SearchConfig {
    /// Get top k (defaults to 5)
    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(5)
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite store
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Get store path (defaults to .semdex/store.sqlite)
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".semdex").join("store.sqlite"))
    }
}

/// Configuration loaded from .semdexrc.toml or ~/.config/semdex/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format (text or json)
    pub default_format: Option<String>,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .semdexrc.toml in current directory
    /// 2. ~/.config/semdex/config.toml
    ///
    /// A file that exists but cannot be read or parsed is an error rather
    /// than a silent fallback to defaults.
    pub fn load() -> Result<Self> {
        if let Some(config) = Self::load_from_path(Path::new(CONFIG_FILE))? {
            return Ok(config);
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("semdex").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path)? {
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SearchError::Configuration(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Self::parse(&content).map(Some).map_err(|e| {
            SearchError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get output format from config, parsing the string to ConfigOutputFormat
    pub fn output_format(&self) -> Option<ConfigOutputFormat> {
        self.default_format
            .as_ref()
            .and_then(|s| match s.to_lowercase().as_str() {
                "json" => Some(ConfigOutputFormat::Json),
                "text" => Some(ConfigOutputFormat::Text),
                _ => None,
            })
    }

    /// Merge CLI top-k with config (CLI wins)
    pub fn merge_top_k(&self, cli_value: Option<usize>) -> usize {
        cli_value.unwrap_or_else(|| self.search.top_k())
    }

    /// Merge CLI index name with config (CLI wins)
    pub fn merge_index_name(&self, cli_value: Option<&str>) -> String {
        cli_value.unwrap_or_else(|| self.index.name()).to_string()
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }

    /// Get the index configuration
    pub fn index(&self) -> &IndexConfig {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_pipeline() {
        let config = Config::default();
        assert_eq!(config.embeddings.provider(), EmbeddingProviderType::Openai);
        assert_eq!(config.embeddings.model(), "text-embedding-ada-002");
        assert_eq!(config.embeddings.dimension(), 1536);
        assert_eq!(config.embeddings.max_tokens(), 8000);
        assert_eq!(config.embeddings.empty_text(), EmptyTextPolicy::Reject);
        assert_eq!(config.index.name(), "sample");
        assert_eq!(config.index.key_strategy(), KeyStrategy::Position);
        assert_eq!(config.search.top_k(), 5);
        assert_eq!(config.store.path(), PathBuf::from(".semdex/store.sqlite"));
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::parse(
            r#"
default_format = "json"

[embeddings]
provider = "dummy"
dimension = 8
max_tokens = 100
empty_text = "embed"
concurrency = 0

[index]
name = "annotators"
key_strategy = "content_hash"

[search]
top_k = 3

[store]
path = "/tmp/semdex.sqlite"
"#,
        )
        .unwrap();

        assert_eq!(config.output_format(), Some(ConfigOutputFormat::Json));
        assert_eq!(config.embeddings.provider(), EmbeddingProviderType::Dummy);
        assert_eq!(config.embeddings.dimension(), 8);
        assert_eq!(config.embeddings.max_tokens(), 100);
        assert_eq!(config.embeddings.empty_text(), EmptyTextPolicy::Embed);
        assert_eq!(config.embeddings.concurrency(), 1);
        assert_eq!(config.index.key_strategy(), KeyStrategy::ContentHash);
        assert_eq!(config.merge_index_name(None), "annotators");
        assert_eq!(config.merge_index_name(Some("other")), "other");
        assert_eq!(config.merge_top_k(None), 3);
        assert_eq!(config.merge_top_k(Some(7)), 7);
        assert_eq!(config.store.path(), PathBuf::from("/tmp/semdex.sqlite"));
    }

    #[test]
    fn unparsable_file_is_a_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[embeddings]\nprovider = \"dumy\"\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(ref msg) if msg.contains("failed to parse")));
        assert!(Config::load_from_path(&dir.path().join("missing.toml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Config::parse("[embeddings]\nprovider = \"fastembed\"\n").is_err());
    }
}
