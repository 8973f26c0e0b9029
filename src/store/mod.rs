//! Storage abstraction for membank.
//!
//! The [`Store`] trait defines all storage operations needed by the write,
//! retrieval, and search pipeline, enabling pluggable backends (SQLite,
//! in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes, and
//! must make [`replace_chunks`](Store::replace_chunks) atomic from a
//! reader's point of view: a reader who re-fetches after a completed
//! replace sees the old chunk set or the new one, never a mix.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::MemoryChunk;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// A chunk scored by vector distance.
///
/// `distance` is a dissimilarity (cosine distance): lower means more
/// similar. It is reported as-is, never re-normalized into a similarity.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub file_name: String,
    pub chunk_index: i64,
    pub text: String,
    pub distance: f64,
}

/// Abstract chunk store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_chunks`](Store::replace_chunks) | Atomically replace all chunks of a file |
/// | [`fetch_file`](Store::fetch_file) | Fetch a file's chunks ordered by index |
/// | [`list_projects`](Store::list_projects) | List projects that have stored content |
/// | [`list_files`](Store::list_files) | List a project's files with ≥ 1 chunk |
/// | [`project_exists`](Store::project_exists) | Whether a project has stored content |
/// | [`delete_file`](Store::delete_file) | Remove a file's chunks |
/// | [`delete_project`](Store::delete_project) | Remove all chunks of a project (cascade) |
/// | [`nearest`](Store::nearest) | Nearest-neighbor query over vectors, distances ascending |
/// | [`candidates`](Store::candidates) | Bounded pool ordered by `(file_name, chunk_index)` |
#[async_trait]
pub trait Store: Send + Sync {
    /// Replace all chunks for `(project, file_name)` in one atomic step.
    async fn replace_chunks(
        &self,
        project: &str,
        file_name: &str,
        chunks: &[MemoryChunk],
    ) -> Result<()>;

    /// Fetch all chunks of a file, ordered by ascending `chunk_index`.
    /// An unknown file yields an empty vector, not an error.
    async fn fetch_file(&self, project: &str, file_name: &str) -> Result<Vec<MemoryChunk>>;

    /// Projects with at least one stored chunk, sorted.
    async fn list_projects(&self) -> Result<Vec<String>>;

    /// Files of a project with at least one stored chunk, sorted.
    /// Files whose chunks were all deleted do not appear.
    async fn list_files(&self, project: &str) -> Result<Vec<String>>;

    /// Whether the project has any stored content.
    async fn project_exists(&self, project: &str) -> Result<bool>;

    /// Delete all chunks of a file. Returns the number of chunks removed.
    async fn delete_file(&self, project: &str, file_name: &str) -> Result<u64>;

    /// Delete all chunks of a project. Returns the number of chunks removed.
    async fn delete_project(&self, project: &str) -> Result<u64>;

    /// Nearest-neighbor query over stored vectors, restricted to one
    /// project and optionally to a file-name allow-list. Results come back
    /// ordered by ascending distance (ties broken by file name then index)
    /// and truncated to `limit`. Chunks without a stored vector are skipped.
    async fn nearest(
        &self,
        project: &str,
        query: &[f32],
        limit: usize,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Bounded candidate pool for keyword filtering: up to `limit` chunks
    /// of the project (optionally restricted to an allow-list), ordered by
    /// `(file_name, chunk_index)`. Chunks beyond the bound are not seen by
    /// the keyword ranker.
    async fn candidates(
        &self,
        project: &str,
        limit: i64,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<MemoryChunk>>;
}
