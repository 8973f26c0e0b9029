//! Core data models used throughout membank.
//!
//! These types represent the chunks and search results that flow through
//! the write and retrieval pipeline.

use serde::Serialize;

/// A stored slice of one project file, embedded independently.
///
/// `chunk_index` values for a `(project, file_name)` pair form a contiguous
/// `0..N-1` range after every successful write; the whole set is replaced
/// atomically on update.
#[derive(Debug, Clone)]
pub struct MemoryChunk {
    pub project: String,
    pub file_name: String,
    pub chunk_index: i64,
    pub text: String,
    /// Embedding of `text`. `None` only between chunking and embedding;
    /// never intentionally persisted.
    pub vector: Option<Vec<f32>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MemoryChunk {
    /// Build an unembedded chunk stamped with the current time.
    pub fn new(project: &str, file_name: &str, chunk_index: i64, text: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            project: project.to_string(),
            file_name: file_name.to_string(),
            chunk_index,
            text,
            vector: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// How a search query is matched against stored chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Embed the query and rank by vector distance (lower = more similar).
    Semantic,
    /// Case-insensitive substring match, ordered by file then index.
    Keyword,
}

impl SearchMode {
    /// Parse a caller-supplied mode string. Unknown values are rejected
    /// by the ranker as invalid arguments, not mapped to a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "semantic" => Some(SearchMode::Semantic),
            "keyword" => Some(SearchMode::Keyword),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Semantic => "semantic",
            SearchMode::Keyword => "keyword",
        }
    }
}

/// A ranked search result.
///
/// `score` is a *distance* in semantic mode (ascending = better, never
/// re-normalized into a similarity) and `None` in keyword mode, where
/// ordering is file-structural rather than relevance-based.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub file_name: String,
    pub chunk_index: i64,
    pub score: Option<f64>,
}
