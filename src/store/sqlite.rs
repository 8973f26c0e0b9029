//! SQLite [`Store`] backend.
//!
//! One table, `memory_chunks`, keyed by `(project, file_name,
//! chunk_index)`. Vectors are stored inline as little-endian f32 BLOBs and
//! cosine distance is computed in Rust over the project's rows — projects
//! are small enough that a brute-force scan beats maintaining a separate
//! vector index. Replace runs in a transaction, so readers see the old
//! chunk set or the new one, never a mix.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::error::Result;
use crate::models::MemoryChunk;

use super::{ScoredChunk, Store};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// `AND file_name IN (?, ...)` for a non-empty allow-list, else nothing.
fn file_filter_clause(filter: Option<&[String]>) -> String {
    match filter {
        Some(names) if !names.is_empty() => {
            format!(" AND file_name IN ({})", vec!["?"; names.len()].join(", "))
        }
        _ => String::new(),
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> MemoryChunk {
    let blob: Option<Vec<u8>> = row.get("vector");
    MemoryChunk {
        project: row.get("project"),
        file_name: row.get("file_name"),
        chunk_index: row.get("chunk_index"),
        text: row.get("text"),
        vector: blob.map(|b| blob_to_vec(&b)),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn replace_chunks(
        &self,
        project: &str,
        file_name: &str,
        chunks: &[MemoryChunk],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM memory_chunks WHERE project = ? AND file_name = ?")
            .bind(project)
            .bind(file_name)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO memory_chunks
                    (id, project, file_name, chunk_index, text, vector, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&chunk.project)
            .bind(&chunk.file_name)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(chunk.vector.as_ref().map(|v| vec_to_blob(v)))
            .bind(chunk.created_at)
            .bind(chunk.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_file(&self, project: &str, file_name: &str) -> Result<Vec<MemoryChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT project, file_name, chunk_index, text, vector, created_at, updated_at
            FROM memory_chunks
            WHERE project = ? AND file_name = ?
            ORDER BY chunk_index ASC
            "#,
        )
        .bind(project)
        .bind(file_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_chunk).collect())
    }

    async fn list_projects(&self) -> Result<Vec<String>> {
        let rows =
            sqlx::query("SELECT DISTINCT project FROM memory_chunks ORDER BY project ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(|r| r.get("project")).collect())
    }

    async fn list_files(&self, project: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT file_name FROM memory_chunks WHERE project = ? ORDER BY file_name ASC",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("file_name")).collect())
    }

    async fn project_exists(&self, project: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM memory_chunks WHERE project = ?")
                .bind(project)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn delete_file(&self, project: &str, file_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM memory_chunks WHERE project = ? AND file_name = ?")
            .bind(project)
            .bind(file_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_project(&self, project: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM memory_chunks WHERE project = ?")
            .bind(project)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn nearest(
        &self,
        project: &str,
        query: &[f32],
        limit: usize,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<ScoredChunk>> {
        let sql = format!(
            r#"
            SELECT file_name, chunk_index, text, vector
            FROM memory_chunks
            WHERE project = ? AND vector IS NOT NULL{}
            "#,
            file_filter_clause(file_filter)
        );

        let mut q = sqlx::query(&sql).bind(project);
        if let Some(names) = file_filter {
            for name in names {
                q = q.bind(name);
            }
        }
        let rows = q.fetch_all(&self.pool).await?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("vector");
                let vector = blob_to_vec(&blob);
                ScoredChunk {
                    file_name: row.get("file_name"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    distance: cosine_distance(query, &vector) as f64,
                }
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
        let sql = format!(
            r#"
            SELECT project, file_name, chunk_index, text, vector, created_at, updated_at
            FROM memory_chunks
            WHERE project = ?{}
            ORDER BY file_name ASC, chunk_index ASC
            LIMIT ?
            "#,
            file_filter_clause(file_filter)
        );

        let mut q = sqlx::query(&sql).bind(project);
        if let Some(names) = file_filter {
            for name in names {
                q = q.bind(name);
            }
        }
        let rows = q.bind(limit).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(row_to_chunk).collect())
    }
}
