//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and concrete implementations:
//! - **[`DisabledEmbedder`]** — construction succeeds, every `embed` call
//!   errors; used for keyword-only deployments.
//! - **[`OpenAiEmbedder`]** — calls the OpenAI embeddings API with
//!   batching, retry, and backoff.
//! - **[`OllamaEmbedder`]** — calls a local Ollama instance's `/api/embed`
//!   endpoint.
//! - **`LocalEmbedder`** — runs a sentence-transformer locally via tract
//!   (feature `local-embeddings-tract`); no network calls after the model
//!   download.
//!
//! Every provider returns L2-normalized vectors, so the dot product of two
//! embeddings equals their cosine similarity and [`cosine_distance`] can
//! rank results without re-normalizing.
//!
//! Also provides vector utilities for BLOB-backed storage:
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes
//! - [`blob_to_vec`] — decode a BLOB back into a `Vec<f32>`
//! - [`cosine_similarity`] / [`cosine_distance`]
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama providers use exponential backoff for transient
//! errors: HTTP 429 and 5xx retry, other 4xx fail immediately, network
//! errors retry. Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5).

#[cfg(feature = "local-embeddings-tract")]
mod local_tract;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{MemoryError, Result};

/// Trait for embedding providers.
///
/// `embed` is an order-preserving batch: one vector per input text, all
/// L2-normalized. A failure anywhere in the batch fails the whole call —
/// callers rely on this for all-or-nothing file updates.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, preserving input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
///
/// Convenience wrapper around [`Embedder::embed`] for single-text use
/// cases (e.g. embedding a search query).
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let results = embedder.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| MemoryError::Dependency("empty embedding response".to_string()))
}

/// Create the appropriate [`Embedder`] based on configuration.
///
/// | Config value | Provider |
/// |--------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"`   | [`OpenAiEmbedder`] |
/// | `"ollama"`   | [`OllamaEmbedder`] |
/// | `"local"`    | `LocalEmbedder` (feature `local-embeddings-tract`) |
///
/// Fails fast: missing config or API keys are reported here, before any
/// chunk is written.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-tract")]
        "local" => Ok(Box::new(local_tract::LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-tract"))]
        "local" => Err(MemoryError::Dependency(
            "local embedding provider requires --features local-embeddings-tract".to_string(),
        )),
        other => Err(MemoryError::InvalidArgument(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Disabled provider ============

/// A no-op embedder that always returns errors.
///
/// Used when `embedding.provider = "disabled"`. Keyword search still works;
/// any semantic operation fails with a descriptive dependency error.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(MemoryError::Dependency(
            "embedding provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            MemoryError::Dependency("embedding.model required for OpenAI provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            MemoryError::Dependency("embedding.dims required for OpenAI provider".to_string())
        })?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(MemoryError::Dependency(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }

        Ok(Self {
            model,
            dims,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| MemoryError::Dependency("OPENAI_API_KEY not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| MemoryError::dependency("http client", e))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| MemoryError::dependency("OpenAI response", e))?;
                        return parse_openai_response(&json);
                    }

                    // Rate limited or server error: retry.
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(MemoryError::Dependency(format!(
                            "OpenAI API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429): don't retry.
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(MemoryError::Dependency(format!(
                        "OpenAI API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(MemoryError::dependency("OpenAI request", e));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| MemoryError::Dependency("embedding failed after retries".to_string())))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            let vectors = self.embed_batch(batch).await?;
            all.extend(vectors.into_iter().map(normalize_l2));
        }
        Ok(all)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
        MemoryError::Dependency("invalid OpenAI response: missing data array".to_string())
    })?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                MemoryError::Dependency("invalid OpenAI response: missing embedding".to_string())
            })?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Ollama provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). Requires an embedding model to be pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    batch_size: usize,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            MemoryError::Dependency("embedding.model required for Ollama provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            MemoryError::Dependency("embedding.dims required for Ollama provider".to_string())
        })?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            dims,
            url,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| MemoryError::dependency("http client", e))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/api/embed", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| MemoryError::dependency("Ollama response", e))?;
                        return parse_ollama_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(MemoryError::Dependency(format!(
                            "Ollama API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(MemoryError::Dependency(format!(
                        "Ollama API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(MemoryError::Dependency(format!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url, e
                    )));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            MemoryError::Dependency("Ollama embedding failed after retries".to_string())
        }))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            let vectors = self.embed_batch(batch).await?;
            all.extend(vectors.into_iter().map(normalize_l2));
        }
        Ok(all)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            MemoryError::Dependency("invalid Ollama response: missing embeddings array".to_string())
        })?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                MemoryError::Dependency(
                    "invalid Ollama response: embedding is not an array".to_string(),
                )
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

// ============ Vector utilities ============

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn normalize_l2(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors of
/// different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance: `1 - cosine_similarity`.
///
/// This is the score semantic search reports — lower means more similar,
/// and it is never converted back into a similarity for display.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
