//! In-memory [`Store`] implementation for testing.
//!
//! Uses a `Vec` behind `std::sync::RwLock` for thread safety. Vector
//! search is brute-force cosine distance over all stored vectors. Replace
//! runs under a single write lock, so readers never observe a partial
//! chunk set.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::Result;
use crate::models::MemoryChunk;

use super::{ScoredChunk, Store};

/// In-memory store for tests.
pub struct InMemoryStore {
    chunks: RwLock<Vec<MemoryChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn in_filter(file_name: &str, filter: Option<&[String]>) -> bool {
    match filter {
        Some(names) => names.iter().any(|n| n == file_name),
        None => true,
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn replace_chunks(
        &self,
        project: &str,
        file_name: &str,
        chunks: &[MemoryChunk],
    ) -> Result<()> {
        let mut stored = self.chunks.write().unwrap();
        stored.retain(|c| !(c.project == project && c.file_name == file_name));
        stored.extend(chunks.iter().cloned());
        Ok(())
    }

    async fn fetch_file(&self, project: &str, file_name: &str) -> Result<Vec<MemoryChunk>> {
        let stored = self.chunks.read().unwrap();
        let mut chunks: Vec<MemoryChunk> = stored
            .iter()
            .filter(|c| c.project == project && c.file_name == file_name)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn list_projects(&self) -> Result<Vec<String>> {
        let stored = self.chunks.read().unwrap();
        let mut projects: Vec<String> = stored.iter().map(|c| c.project.clone()).collect();
        projects.sort();
        projects.dedup();
        Ok(projects)
    }

    async fn list_files(&self, project: &str) -> Result<Vec<String>> {
        let stored = self.chunks.read().unwrap();
        let mut files: Vec<String> = stored
            .iter()
            .filter(|c| c.project == project)
            .map(|c| c.file_name.clone())
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    async fn project_exists(&self, project: &str) -> Result<bool> {
        let stored = self.chunks.read().unwrap();
        Ok(stored.iter().any(|c| c.project == project))
    }

    async fn delete_file(&self, project: &str, file_name: &str) -> Result<u64> {
        let mut stored = self.chunks.write().unwrap();
        let before = stored.len();
        stored.retain(|c| !(c.project == project && c.file_name == file_name));
        Ok((before - stored.len()) as u64)
    }

    async fn delete_project(&self, project: &str) -> Result<u64> {
        let mut stored = self.chunks.write().unwrap();
        let before = stored.len();
        stored.retain(|c| c.project != project);
        Ok((before - stored.len()) as u64)
    }

    async fn nearest(
        &self,
        project: &str,
        query: &[f32],
        limit: usize,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<ScoredChunk>> {
        let stored = self.chunks.read().unwrap();
        let mut scored: Vec<ScoredChunk> = stored
            .iter()
            .filter(|c| c.project == project && in_filter(&c.file_name, file_filter))
            .filter_map(|c| {
                c.vector.as_ref().map(|v| ScoredChunk {
                    file_name: c.file_name.clone(),
                    chunk_index: c.chunk_index,
                    text: c.text.clone(),
                    distance: cosine_distance(query, v) as f64,
                })
            })
            .collect();
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_name.cmp(&b.file_name))
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn candidates(
        &self,
        project: &str,
        limit: i64,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<MemoryChunk>> {
        let stored = self.chunks.read().unwrap();
        let mut pool: Vec<MemoryChunk> = stored
            .iter()
            .filter(|c| c.project == project && in_filter(&c.file_name, file_filter))
            .cloned()
            .collect();
        pool.sort_by(|a, b| {
            a.file_name
                .cmp(&b.file_name)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        pool.truncate(limit.max(0) as usize);
        Ok(pool)
    }
}
