//! Search ranking over stored chunks.
//!
//! Two modes share one result shape:
//!
//! - **semantic** — embed the query, ask the store for the nearest chunks,
//!   and order by ascending distance (a dissimilarity; it is reported
//!   as-is, never re-normalized). Ties break on `(file_name, chunk_index)`
//!   so results are deterministic across backends.
//! - **keyword** — fetch a bounded candidate pool, keep chunks whose text
//!   contains the query case-insensitively, and order by
//!   `(file_name, chunk_index)`. The ordering is file-structural, not
//!   relevance-based, and every hit's score is `None`.
//!
//! Argument validation happens before the store or embedder is touched;
//! an unknown project is rejected before any candidate query runs.

use crate::config::SearchConfig;
use crate::embedding::{embed_query, Embedder};
use crate::error::{MemoryError, Result};
use crate::models::{SearchHit, SearchMode};
use crate::store::Store;

/// Run a search over one project's stored chunks.
///
/// `file_filter` restricts both modes to an allow-list of file names.
/// Results are truncated to `top_k` after ordering.
pub async fn search(
    store: &dyn Store,
    embedder: &dyn Embedder,
    config: &SearchConfig,
    project: &str,
    query: &str,
    mode: &str,
    top_k: usize,
    file_filter: Option<&[String]>,
) -> Result<Vec<SearchHit>> {
    let mode = SearchMode::parse(mode).ok_or_else(|| {
        MemoryError::InvalidArgument(format!(
            "unsupported search mode: '{}' (use semantic or keyword)",
            mode
        ))
    })?;

    if query.trim().is_empty() {
        return Err(MemoryError::InvalidArgument(
            "query must not be empty".to_string(),
        ));
    }

    if top_k == 0 || top_k > config.max_top_k {
        return Err(MemoryError::InvalidArgument(format!(
            "top_k must be in 1..={}",
            config.max_top_k
        )));
    }

    if !store.project_exists(project).await? {
        return Err(MemoryError::NotFound(format!("project '{}'", project)));
    }

    match mode {
        SearchMode::Semantic => semantic_search(store, embedder, project, query, top_k, file_filter).await,
        SearchMode::Keyword => {
            keyword_search(store, config, project, query, top_k, file_filter).await
        }
    }
}

async fn semantic_search(
    store: &dyn Store,
    embedder: &dyn Embedder,
    project: &str,
    query: &str,
    top_k: usize,
    file_filter: Option<&[String]>,
) -> Result<Vec<SearchHit>> {
    let query_vec = embed_query(embedder, query).await?;
    let scored = store
        .nearest(project, &query_vec, top_k, file_filter)
        .await?;

    let mut hits: Vec<SearchHit> = scored
        .into_iter()
        .map(|s| SearchHit {
            text: s.text,
            file_name: s.file_name,
            chunk_index: s.chunk_index,
            score: Some(s.distance),
        })
        .collect();

    // The store already orders ascending; re-sorting here pins the
    // tie-break so the final ordering never depends on the backend.
    hits.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file_name.cmp(&b.file_name))
            .then(a.chunk_index.cmp(&b.chunk_index))
    });
    hits.truncate(top_k);
    Ok(hits)
}

async fn keyword_search(
    store: &dyn Store,
    config: &SearchConfig,
    project: &str,
    query: &str,
    top_k: usize,
    file_filter: Option<&[String]>,
) -> Result<Vec<SearchHit>> {
    let pool = store
        .candidates(project, config.candidate_pool, file_filter)
        .await?;

    let needle = query.to_lowercase();
    let mut hits: Vec<SearchHit> = pool
        .into_iter()
        .filter(|c| c.text.to_lowercase().contains(&needle))
        .map(|c| SearchHit {
            text: c.text,
            file_name: c.file_name,
            chunk_index: c.chunk_index,
            score: None,
        })
        .collect();

    hits.sort_by(|a, b| {
        a.file_name
            .cmp(&b.file_name)
            .then(a.chunk_index.cmp(&b.chunk_index))
    });
    hits.truncate(top_k);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::StubEmbedder;
    use crate::embedding::DisabledEmbedder;
    use crate::models::MemoryChunk;
    use crate::store::{InMemoryStore, ScoredChunk};
    use async_trait::async_trait;

    fn config() -> SearchConfig {
        SearchConfig {
            candidate_pool: 100,
            max_top_k: 20,
        }
    }

    async fn seed_keyword_fixture(store: &InMemoryStore) {
        store
            .replace_chunks(
                "p",
                "fileA.md",
                &[
                    MemoryChunk::new("p", "fileA.md", 0, "hello world".to_string()),
                    MemoryChunk::new("p", "fileA.md", 1, "middle".to_string()),
                    MemoryChunk::new("p", "fileA.md", 2, "no match".to_string()),
                ],
            )
            .await
            .unwrap();
        store
            .replace_chunks(
                "p",
                "fileB.md",
                &[MemoryChunk::new("p", "fileB.md", 0, "hello".to_string())],
            )
            .await
            .unwrap();
    }

    /// Store double with preset nearest-neighbor results, deliberately
    /// returned unordered to prove the ranker pins the final ordering.
    struct FixedDistanceStore {
        scored: Vec<ScoredChunk>,
    }

    #[async_trait]
    impl Store for FixedDistanceStore {
        async fn replace_chunks(
            &self,
            _project: &str,
            _file_name: &str,
            _chunks: &[MemoryChunk],
        ) -> crate::error::Result<()> {
            Ok(())
        }

        async fn fetch_file(
            &self,
            _project: &str,
            _file_name: &str,
        ) -> crate::error::Result<Vec<MemoryChunk>> {
            Ok(Vec::new())
        }

        async fn list_projects(&self) -> crate::error::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn list_files(&self, _project: &str) -> crate::error::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn project_exists(&self, _project: &str) -> crate::error::Result<bool> {
            Ok(true)
        }

        async fn delete_file(
            &self,
            _project: &str,
            _file_name: &str,
        ) -> crate::error::Result<u64> {
            Ok(0)
        }

        async fn delete_project(&self, _project: &str) -> crate::error::Result<u64> {
            Ok(0)
        }

        async fn nearest(
            &self,
            _project: &str,
            _query: &[f32],
            limit: usize,
            _file_filter: Option<&[String]>,
        ) -> crate::error::Result<Vec<ScoredChunk>> {
            let mut scored = self.scored.clone();
            scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
            scored.truncate(limit);
            Ok(scored)
        }

        async fn candidates(
            &self,
            _project: &str,
            _limit: i64,
            _file_filter: Option<&[String]>,
        ) -> crate::error::Result<Vec<MemoryChunk>> {
            Ok(Vec::new())
        }
    }

    fn scored(file: &str, index: i64, distance: f64) -> ScoredChunk {
        ScoredChunk {
            file_name: file.to_string(),
            chunk_index: index,
            text: format!("{}#{}", file, index),
            distance,
        }
    }

    #[tokio::test]
    async fn test_semantic_orders_by_ascending_distance() {
        let store = FixedDistanceStore {
            scored: vec![
                scored("a.md", 0, 0.1),
                scored("a.md", 1, 0.9),
                scored("a.md", 2, 0.3),
                scored("b.md", 0, 0.05),
                scored("b.md", 1, 0.5),
            ],
        };
        let embedder = StubEmbedder::new();

        let hits = search(&store, &embedder, &config(), "p", "query", "semantic", 3, None)
            .await
            .unwrap();

        let distances: Vec<f64> = hits.iter().map(|h| h.score.unwrap()).collect();
        assert_eq!(distances, vec![0.05, 0.1, 0.3]);
    }

    #[tokio::test]
    async fn test_semantic_ties_break_on_file_then_index() {
        let store = FixedDistanceStore {
            scored: vec![
                scored("b.md", 0, 0.2),
                scored("a.md", 1, 0.2),
                scored("a.md", 0, 0.2),
            ],
        };
        let embedder = StubEmbedder::new();

        let hits = search(&store, &embedder, &config(), "p", "query", "semantic", 3, None)
            .await
            .unwrap();

        let order: Vec<(String, i64)> = hits
            .iter()
            .map(|h| (h.file_name.clone(), h.chunk_index))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.md".to_string(), 0),
                ("a.md".to_string(), 1),
                ("b.md".to_string(), 0)
            ]
        );
    }

    #[tokio::test]
    async fn test_keyword_orders_by_file_then_index_with_null_scores() {
        let store = InMemoryStore::new();
        seed_keyword_fixture(&store).await;
        let embedder = DisabledEmbedder;

        let hits = search(&store, &embedder, &config(), "p", "hello", "keyword", 10, None)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file_name, "fileA.md");
        assert_eq!(hits[0].chunk_index, 0);
        assert_eq!(hits[1].file_name, "fileB.md");
        assert_eq!(hits[1].chunk_index, 0);
        assert!(hits.iter().all(|h| h.score.is_none()));
    }

    #[tokio::test]
    async fn test_keyword_match_is_case_insensitive() {
        let store = InMemoryStore::new();
        seed_keyword_fixture(&store).await;
        let embedder = DisabledEmbedder;

        let hits = search(&store, &embedder, &config(), "p", "HELLO", "keyword", 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_keyword_respects_file_filter() {
        let store = InMemoryStore::new();
        seed_keyword_fixture(&store).await;
        let embedder = DisabledEmbedder;

        let filter = vec!["fileB.md".to_string()];
        let hits = search(
            &store,
            &embedder,
            &config(),
            "p",
            "hello",
            "keyword",
            10,
            Some(&filter),
        )
        .await
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "fileB.md");
    }

    #[tokio::test]
    async fn test_keyword_candidate_pool_bounds_matches() {
        let store = InMemoryStore::new();
        seed_keyword_fixture(&store).await;
        let embedder = DisabledEmbedder;

        // Pool of 2 sees only fileA.md#0 and fileA.md#1; the match in
        // fileB.md sits beyond the bound and is missed.
        let small_pool = SearchConfig {
            candidate_pool: 2,
            max_top_k: 20,
        };
        let hits = search(&store, &embedder, &small_pool, "p", "hello", "keyword", 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "fileA.md");
    }

    #[tokio::test]
    async fn test_keyword_truncates_to_top_k() {
        let store = InMemoryStore::new();
        seed_keyword_fixture(&store).await;
        let embedder = DisabledEmbedder;

        let hits = search(&store, &embedder, &config(), "p", "hello", "keyword", 1, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "fileA.md");
    }

    #[tokio::test]
    async fn test_unknown_mode_rejected_before_store() {
        let store = InMemoryStore::new();
        let embedder = DisabledEmbedder;
        let err = search(&store, &embedder, &config(), "p", "q", "hybrid", 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let store = InMemoryStore::new();
        let embedder = DisabledEmbedder;
        let err = search(&store, &embedder, &config(), "p", "   ", "keyword", 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_top_k_out_of_range_rejected() {
        let store = InMemoryStore::new();
        let embedder = DisabledEmbedder;
        for top_k in [0usize, 21] {
            let err = search(&store, &embedder, &config(), "p", "q", "keyword", top_k, None)
                .await
                .unwrap_err();
            assert!(matches!(err, MemoryError::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let store = InMemoryStore::new();
        let embedder = DisabledEmbedder;
        let err = search(&store, &embedder, &config(), "ghost", "q", "keyword", 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_semantic_with_disabled_embedder_is_dependency_error() {
        let store = InMemoryStore::new();
        seed_keyword_fixture(&store).await;
        let embedder = DisabledEmbedder;
        let err = search(&store, &embedder, &config(), "p", "q", "semantic", 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Dependency(_)));
    }

    #[tokio::test]
    async fn test_semantic_end_to_end_with_stub_embedder() {
        let store = InMemoryStore::new();
        let embedder = StubEmbedder::new();

        // Store chunks embedded with the same stub the query will use; the
        // chunk whose text equals the query has distance ~0 and ranks first.
        let texts = ["deploy runbook", "grocery list", "meeting notes"];
        let vectors = embedder
            .embed(&texts.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .await
            .unwrap();
        let chunks: Vec<MemoryChunk> = texts
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, vector))| {
                let mut c = MemoryChunk::new("p", "notes.md", i as i64, text.to_string());
                c.vector = Some(vector);
                c
            })
            .collect();
        store.replace_chunks("p", "notes.md", &chunks).await.unwrap();

        let hits = search(
            &store,
            &embedder,
            &config(),
            "p",
            "deploy runbook",
            "semantic",
            3,
            None,
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "deploy runbook");
        assert!(hits[0].score.unwrap() < 1e-5);
        assert!(hits[0].score.unwrap() <= hits[1].score.unwrap());
    }
}
