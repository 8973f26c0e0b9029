//! Tract-based local embedding backend.
//!
//! Pure-Rust path: loads the ONNX model with tract-onnx, tokenizes with
//! the tokenizers crate, runs inference in spawn_blocking, mean-pools the
//! token representations, and L2-normalizes the result. No ONNX Runtime
//! or system deps.

use std::path::PathBuf;

use async_trait::async_trait;
use tract_onnx::prelude::*;

use crate::config::EmbeddingConfig;
use crate::error::{MemoryError, Result};

use super::{normalize_l2, Embedder};

const ALL_MINILM_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";
const ALL_MINILM_DIMS: usize = 384;
const DEFAULT_MAX_LEN: usize = 256;

/// Model manifest: name -> (onnx path in repo, tokenizer path in repo, dims).
fn model_manifest(model_name: &str) -> Result<(&'static str, &'static str, usize)> {
    match model_name {
        "all-minilm-l6-v2" => Ok(("onnx/model.onnx", "tokenizer.json", ALL_MINILM_DIMS)),
        _ => Err(MemoryError::Dependency(format!(
            "tract backend supports only all-minilm-l6-v2 for now. Requested: '{}'",
            model_name
        ))),
    }
}

fn cache_dir() -> Result<PathBuf> {
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(base)
        .join(".cache")
        .join("membank")
        .join("models");
    std::fs::create_dir_all(&dir).map_err(|e| MemoryError::dependency("create cache dir", e))?;
    Ok(dir)
}

fn download_to_cache(repo: &str, path: &str, cache_path: &std::path::Path) -> Result<()> {
    if cache_path.exists() {
        return Ok(());
    }
    let url = format!(
        "https://huggingface.co/{}/resolve/main/{}",
        repo,
        path.replace(' ', "%20")
    );
    let resp = reqwest::blocking::get(&url)
        .map_err(|e| MemoryError::dependency("download model", e))?
        .error_for_status()
        .map_err(|e| MemoryError::dependency("download model", e))?;
    let bytes = resp
        .bytes()
        .map_err(|e| MemoryError::dependency("read model body", e))?;
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| MemoryError::dependency("create cache parent", e))?;
    }
    std::fs::write(cache_path, &bytes).map_err(|e| MemoryError::dependency("write cache", e))?;
    Ok(())
}

/// Ensure model and tokenizer are in cache; return (onnx path, tokenizer path).
fn ensure_cached(model_name: &str) -> Result<(PathBuf, PathBuf)> {
    let (onnx_rel, tokenizer_rel, _) = model_manifest(model_name)?;
    let dir = cache_dir()?;
    let model_dir = dir.join(model_name);
    let onnx_path = model_dir.join(onnx_rel);
    let tokenizer_path = model_dir.join(tokenizer_rel);
    download_to_cache(ALL_MINILM_REPO, onnx_rel, &onnx_path)?;
    download_to_cache(ALL_MINILM_REPO, tokenizer_rel, &tokenizer_path)?;
    Ok((onnx_path, tokenizer_path))
}

/// Local sentence-transformer embedder.
///
/// Model files are downloaded on first use and cached; after that,
/// embedding runs entirely offline.
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        let (_, _, dims) = model_manifest(&model_name)?;
        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size.max(1),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model_name = self.model_name.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || run_tract_embed(&model_name, batch_size, &texts))
            .await
            .map_err(|e| MemoryError::dependency("embedding task", e))?
    }
}

fn run_tract_embed(model_name: &str, batch_size: usize, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let (_, _, dims) = model_manifest(model_name)?;
    let (onnx_path, tokenizer_path) = ensure_cached(model_name)?;

    let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| MemoryError::dependency("load tokenizer", e))?;

    let model = tract_onnx::onnx()
        .model_for_path(onnx_path)
        .map_err(|e| MemoryError::dependency("load ONNX", e))?
        .into_optimized()
        .map_err(|e| MemoryError::dependency("optimize", e))?
        .into_runnable()
        .map_err(|e| MemoryError::dependency("build tract runnable", e))?;

    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size) {
        let encodings: Vec<_> = chunk
            .iter()
            .map(|s| {
                tokenizer
                    .encode(s.as_str(), true)
                    .map_err(|e| MemoryError::dependency("tokenize", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(1)
            .min(DEFAULT_MAX_LEN);

        let batch_size_actual = encodings.len();
        let mut input_ids = vec![0i64; batch_size_actual * max_len];
        let mut attention_mask = vec![0i64; batch_size_actual * max_len];

        for (i, enc) in encodings.iter().enumerate() {
            let ids = enc.get_ids();
            let len = ids.len().min(max_len);
            for (j, &id) in ids.iter().take(len).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = 1;
            }
        }

        let input_ids_tensor =
            ndarray::Array2::from_shape_vec((batch_size_actual, max_len), input_ids)
                .map_err(|e| MemoryError::dependency("input ids shape", e))?;
        let attention_mask_tensor =
            ndarray::Array2::from_shape_vec((batch_size_actual, max_len), attention_mask)
                .map_err(|e| MemoryError::dependency("attention mask shape", e))?;

        let input_ids_t: Tensor = input_ids_tensor.into();
        let attention_mask_t: Tensor = attention_mask_tensor.into();
        let result = model
            .run(tvec!(input_ids_t.into(), attention_mask_t.into()))
            .map_err(|e| MemoryError::dependency("inference", e))?;

        let output = result
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::Dependency("no output tensor".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| MemoryError::dependency("output to array", e))?;

        // Output shape is often [batch, seq_len, 384] (last_hidden_state);
        // mean-pool over seq_len. Or [batch, 384] if sentence_embedding.
        // Handle both.
        let shape = view.shape();
        if shape.len() == 2 {
            for i in 0..shape[0] {
                let row = view.slice(ndarray::s![i, ..]);
                let vec: Vec<f32> = row.iter().copied().collect();
                all_embeddings.push(normalize_l2(vec));
            }
        } else if shape.len() == 3 {
            let seq_len = shape[1];
            for (i, enc) in encodings.iter().enumerate() {
                let valid_len = enc.get_ids().len().min(seq_len).min(max_len);
                let mut sum = vec![0f32; dims];
                let mut count = 0f32;
                for j in 0..valid_len {
                    for (k, &v) in view.slice(ndarray::s![i, j, ..]).iter().enumerate() {
                        if k < dims {
                            sum[k] += v;
                        }
                    }
                    count += 1.0;
                }
                if count > 0.0 {
                    for x in &mut sum {
                        *x /= count;
                    }
                }
                all_embeddings.push(normalize_l2(sum));
            }
        } else {
            return Err(MemoryError::Dependency(format!(
                "unexpected output shape: {:?}",
                shape
            )));
        }
    }

    Ok(all_embeddings)
}
