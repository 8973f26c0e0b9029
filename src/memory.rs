//! Write and retrieval pipeline.
//!
//! Coordinates the full update flow for one file: split → embed → replace,
//! and the read flow: fetch ordered chunks → concatenate. The store is
//! only touched after every chunk of the batch has an embedding, so a
//! failed update leaves the previously stored chunk set intact.

use log::{debug, info};

use crate::embedding::Embedder;
use crate::error::{MemoryError, Result};
use crate::models::MemoryChunk;
use crate::splitter::TextSplitter;
use crate::store::Store;

/// Replace the stored chunk set for `(project, file_name)` with the chunks
/// of `text`. Returns the number of chunks written.
///
/// Empty or whitespace-only `text` stores zero chunks, which removes the
/// file from listings (the degenerate "whole file deleted" write).
///
/// With an embedder, every chunk is embedded before the store is touched;
/// any embedding failure aborts the update and the old chunks stay in
/// place. Without one (keyword-only deployment), chunks are stored
/// unembedded and semantic search over them reports a dependency error.
pub async fn replace_file_chunks(
    store: &dyn Store,
    splitter: &TextSplitter<'_>,
    embedder: Option<&dyn Embedder>,
    project: &str,
    file_name: &str,
    text: &str,
) -> Result<usize> {
    let texts = splitter.split(text)?;
    debug!(
        "split {}/{} into {} chunks",
        project,
        file_name,
        texts.len()
    );

    let mut chunks: Vec<MemoryChunk> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| MemoryChunk::new(project, file_name, i as i64, t.clone()))
        .collect();

    if let Some(embedder) = embedder {
        if !chunks.is_empty() {
            // All-or-nothing: the whole batch must embed before any write.
            let vectors = embedder.embed(&texts).await?;
            if vectors.len() != chunks.len() {
                return Err(MemoryError::Dependency(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                )));
            }
            for (chunk, vector) in chunks.iter_mut().zip(vectors) {
                chunk.vector = Some(vector);
            }
        }
    }

    store.replace_chunks(project, file_name, &chunks).await?;
    info!(
        "stored {} chunks for {}/{}",
        chunks.len(),
        project,
        file_name
    );
    Ok(chunks.len())
}

/// Reconstruct a file by concatenating its chunks in index order.
///
/// With `chunk_overlap > 0` the overlap regions appear twice in the
/// result; reconstruction does not de-duplicate.
pub async fn get_file_content(
    store: &dyn Store,
    project: &str,
    file_name: &str,
) -> Result<String> {
    let chunks = store.fetch_file(project, file_name).await?;
    if chunks.is_empty() {
        return Err(MemoryError::NotFound(format!(
            "file '{}' in project '{}'",
            file_name, project
        )));
    }
    Ok(chunks.into_iter().map(|c| c.text).collect())
}

/// Projects with stored content, sorted.
pub async fn list_projects(store: &dyn Store) -> Result<Vec<String>> {
    store.list_projects().await
}

/// Files of a project with stored content, sorted.
pub async fn list_files(store: &dyn Store, project: &str) -> Result<Vec<String>> {
    if !store.project_exists(project).await? {
        return Err(MemoryError::NotFound(format!("project '{}'", project)));
    }
    store.list_files(project).await
}

/// Delete one file's chunks. `NotFound` when the file had no content.
pub async fn delete_file(store: &dyn Store, project: &str, file_name: &str) -> Result<u64> {
    let removed = store.delete_file(project, file_name).await?;
    if removed == 0 {
        return Err(MemoryError::NotFound(format!(
            "file '{}' in project '{}'",
            file_name, project
        )));
    }
    Ok(removed)
}

/// Delete a whole project's chunks (cascade). `NotFound` when empty.
pub async fn delete_project(store: &dyn Store, project: &str) -> Result<u64> {
    let removed = store.delete_project(project).await?;
    if removed == 0 {
        return Err(MemoryError::NotFound(format!("project '{}'", project)));
    }
    Ok(removed)
}
