//! Tokenizer adapter for token-accurate chunk measurement.
//!
//! The chunker never counts characters or words; every budget decision is
//! made in the embedding model's own token space. This module wraps the
//! `tokenizers` crate behind a small trait so the splitter and tests can
//! take the adapter by reference.
//!
//! The vocabulary file (`tokenizer.json`) comes from a configured local
//! path or is downloaded once from Hugging Face and cached, the same way
//! the local embedding backend caches its model files. Loading happens
//! exactly once at startup; a missing or unreadable vocabulary is a fatal
//! configuration error for the whole subsystem, not a per-call failure.

use std::path::PathBuf;

use crate::config::TokenizerConfig;
use crate::error::{MemoryError, Result};

/// Token measurement and slicing contract used by the chunker.
///
/// `encode` is deterministic for a fixed vocabulary. `decode` is a
/// best-effort inverse; whitespace normalization is acceptable, and only
/// the token-window base case of the splitter relies on it.
pub trait Tokenizer: Send + Sync {
    /// Convert text to token ids, without special tokens (counts must
    /// compose across concatenation).
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Convert token ids back to text.
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Number of tokens `text` encodes to.
    fn token_count(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }
}

/// Hugging Face tokenizer adapter.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    /// Load from config: explicit `path` wins, otherwise the `model`
    /// repo's tokenizer.json is fetched into the cache on first use.
    pub fn from_config(config: &TokenizerConfig) -> Result<Self> {
        let path = match &config.path {
            Some(p) => p.clone(),
            None => ensure_cached(&config.model)?,
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| MemoryError::dependency("tokenizer load", e))?;
        Ok(Self { inner })
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| MemoryError::dependency("tokenizer encode", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| MemoryError::dependency("tokenizer decode", e))
    }
}

fn cache_dir() -> Result<PathBuf> {
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(base)
        .join(".cache")
        .join("membank")
        .join("tokenizers");
    std::fs::create_dir_all(&dir)
        .map_err(|e| MemoryError::dependency("create tokenizer cache dir", e))?;
    Ok(dir)
}

/// Ensure `tokenizer.json` for the repo is in the cache; return its path.
fn ensure_cached(repo: &str) -> Result<PathBuf> {
    let dir = cache_dir()?;
    let cache_path = dir.join(repo.replace('/', "--")).join("tokenizer.json");
    if cache_path.exists() {
        return Ok(cache_path);
    }

    let url = format!("https://huggingface.co/{}/resolve/main/tokenizer.json", repo);
    let resp = reqwest::blocking::get(&url)
        .map_err(|e| MemoryError::dependency("download tokenizer", e))?
        .error_for_status()
        .map_err(|e| MemoryError::dependency("download tokenizer", e))?;
    let bytes = resp
        .bytes()
        .map_err(|e| MemoryError::dependency("read tokenizer body", e))?;
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| MemoryError::dependency("create tokenizer cache parent", e))?;
    }
    std::fs::write(&cache_path, &bytes)
        .map_err(|e| MemoryError::dependency("write tokenizer cache", e))?;
    Ok(cache_path)
}


#[cfg(test)]
mod tests {
    use super::testing::WordTokenizer;
    use super::*;

    #[test]
    fn test_word_tokenizer_counts_words() {
        let tok = WordTokenizer::new();
        assert_eq!(tok.token_count("one two three").unwrap(), 3);
        assert_eq!(tok.token_count("").unwrap(), 0);
        assert_eq!(tok.token_count("   ").unwrap(), 0);
    }

    #[test]
    fn test_word_tokenizer_encode_is_deterministic() {
        let tok = WordTokenizer::new();
        let a = tok.encode("alpha beta alpha").unwrap();
        let b = tok.encode("alpha beta alpha").unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0], a[2]);
    }

    #[test]
    fn test_word_tokenizer_decode_round_trip() {
        let tok = WordTokenizer::new();
        let ids = tok.encode("the quick brown fox").unwrap();
        assert_eq!(tok.decode(&ids).unwrap(), "the quick brown fox");
    }
}
