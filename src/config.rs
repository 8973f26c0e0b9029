use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Chunking budget, shared by every write in a deployment (not per call).
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    450
}
fn default_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Candidate pool fetched before keyword filtering. Bounds the cost of
    /// substring search on large projects; matches beyond it are missed.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: i64,
    /// Upper bound on caller-supplied top_k.
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_pool: default_candidate_pool(),
            max_top_k: default_max_top_k(),
        }
    }
}

fn default_candidate_pool() -> i64 {
    100
}
fn default_max_top_k() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Where the chunker's tokenizer vocabulary comes from.
///
/// With no `path`, the tokenizer.json for `model` is downloaded from
/// Hugging Face on first use and cached under `~/.cache/membank/tokenizers`.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenizerConfig {
    /// Local tokenizer.json path. Takes precedence over `model`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Hugging Face repo to fetch the tokenizer from.
    #[serde(default = "default_tokenizer_model")]
    pub model: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            path: None,
            model: default_tokenizer_model(),
        }
    }
}

fn default_tokenizer_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
