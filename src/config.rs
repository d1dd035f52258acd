//! Configuration for ingestion, retrieval and evaluation.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{RagError, Result};
use crate::store::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens for response when the caller does not set one
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation when the caller does not set one
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    #[default]
    Http,
    /// Local sentence-transformers model (requires the `local-embeddings` feature).
    Local,
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Base URL for the embeddings API. Falls back to the LLM base when empty.
    pub api_base: String,
    /// API key. Falls back to the LLM key when empty.
    pub api_key: String,
    /// Model id, e.g. "text-embedding-3-small" or
    /// "sentence-transformers/all-MiniLM-L6-v2" for the local backend.
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Http,
            api_base: String::new(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
        }
    }
}

/// Where documents come from and where the index lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Folder of `*.md` files.
    pub data_dir: PathBuf,
    /// Snapshot file of the local vector index (`.json` or `.bin`).
    pub index_path: PathBuf,
    /// Collection name inside the index.
    pub collection: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_path: PathBuf::from("index/vectors.bin"),
            collection: "stayeasy_docs".to_string(),
        }
    }
}

/// Chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Soft upper bound on chunk length, in characters.
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::chunker::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            metric: DistanceMetric::default(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Name of the product the assistant supports, used in the prompt.
    pub assistant_name: String,
    /// Output budget for generated answers.
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            assistant_name: "StayEasy".to_string(),
            max_tokens: 500,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    embedding: Option<EmbeddingConfig>,
    corpus: Option<CorpusConfig>,
    chunking: Option<ChunkingConfig>,
    retrieval: Option<RetrievalConfig>,
    generation: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, RAG_DATA_DIR, ...)
    /// 2. Config file (~/.config/md-rag/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, filling gaps with defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| RagError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }
        if let Some(embedding) = file_config.embedding {
            config.embedding = embedding;
        }
        if let Some(corpus) = file_config.corpus {
            config.corpus = corpus;
        }
        if let Some(chunking) = file_config.chunking {
            config.chunking = chunking;
        }
        if let Some(retrieval) = file_config.retrieval {
            config.retrieval = retrieval;
        }
        if let Some(generation) = file_config.generation {
            config.generation = generation;
        }

        Ok(config)
    }

    /// Override values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_base) = lookup("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }
        if let Some(api_key) = lookup("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(tokens) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = tokens;
        }
        if let Some(temp) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = temp;
        }

        if let Some(api_base) = lookup("EMBEDDING_API_BASE") {
            self.embedding.api_base = api_base;
        }
        if let Some(api_key) = lookup("EMBEDDING_API_KEY") {
            self.embedding.api_key = api_key;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(dir) = lookup("RAG_DATA_DIR") {
            self.corpus.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("RAG_INDEX_PATH") {
            self.corpus.index_path = PathBuf::from(path);
        }
        if let Some(collection) = lookup("RAG_COLLECTION") {
            self.corpus.collection = collection;
        }
        if let Some(size) = lookup("RAG_CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            self.chunking.chunk_size = size;
        }
        if let Some(top_k) = lookup("RAG_TOP_K").and_then(|v| v.parse().ok()) {
            self.retrieval.top_k = top_k;
        }
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "md-rag")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Embedding API base, falling back to the LLM base.
    pub fn embedding_api_base(&self) -> &str {
        if self.embedding.api_base.is_empty() {
            &self.llm.api_base
        } else {
            &self.embedding.api_base
        }
    }

    /// Embedding API key, falling back to the LLM key.
    pub fn embedding_api_key(&self) -> &str {
        if self.embedding.api_key.is_empty() {
            &self.llm.api_key
        } else {
            &self.embedding.api_key
        }
    }

    /// Validate settings that every pipeline needs.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Config(
                "chunking.chunk_size must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(RagError::Config(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }

        if self.corpus.collection.trim().is_empty() {
            return Err(RagError::Config(
                "Collection name is required. Set RAG_COLLECTION or add corpus.collection to config file.".to_string(),
            ));
        }

        if self.embedding.model.is_empty() {
            return Err(RagError::Config(
                "Embedding model is required. Set EMBEDDING_MODEL environment variable or add to config file.".to_string(),
            ));
        }

        if self.embedding.backend == EmbeddingBackend::Http && self.embedding_api_base().is_empty()
        {
            return Err(RagError::Config(
                "Embedding API base URL is required. Set EMBEDDING_API_BASE or LLM_API_BASE."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the settings needed to call the language model.
    pub fn validate_llm(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(RagError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(RagError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.corpus.collection, "stayeasy_docs");
    }

    #[test]
    fn test_validate_llm_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate_llm().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = Config::with_llm("https://api.example.com", "key", "gpt-4o-mini");
        assert!(config.validate().is_ok());

        config.chunking.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embedding_falls_back_to_llm_credentials() {
        let mut config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.embedding_api_base(), "https://api.example.com");
        assert_eq!(config.embedding_api_key(), "test-key");

        config.embedding.api_base = "http://localhost:11434".to_string();
        assert_eq!(config.embedding_api_base(), "http://localhost:11434");
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
llm:
  api_base: "https://api.example.com"
  model: "gpt-4o"
chunking:
  chunk_size: 400
retrieval:
  top_k: 3
  metric: l2
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 500);
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.metric, DistanceMetric::L2);
        assert_eq!(config.corpus.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LLM_API_KEY", "env-key"),
            ("RAG_CHUNK_SIZE", "1200"),
            ("RAG_TOP_K", "not-a-number"),
            ("RAG_COLLECTION", "handbook"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key, "env-key");
        assert_eq!(config.chunking.chunk_size, 1200);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.corpus.collection, "handbook");
    }
}
