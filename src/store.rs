//! SQLite-backed vector store.
//!
//! One logical table keyed by `(source, source_id, chunk_index)` holds the
//! text, metadata, and embedding of every ingested document. Embeddings are
//! little-endian f32 BLOBs; nearest-neighbor search loads candidate rows and
//! ranks them by cosine distance in Rust, ascending (closest first).
//!
//! Upserts are independently atomic; there are no multi-document
//! transactional guarantees, and concurrent writers to the same key are
//! last-write-wins.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::{Document, FactRow, ScoredDocument, Source};

pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    /// Open the store's database. Opened once per process and passed by
    /// reference; call [`close`](VectorStore::close) at the end.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Insert or replace the row for this document's key. Re-ingesting an
    /// unchanged document overwrites with identical content; a changed one
    /// replaces text, metadata, and embedding at the same key.
    pub async fn upsert(&self, document: &Document, embedding: &[f32]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let metadata_json = serde_json::to_string(&document.metadata)?;
        let blob = vec_to_blob(embedding);

        sqlx::query(
            r#"
            INSERT INTO documents (source, source_id, chunk_index, title, text, embedding, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source, source_id, chunk_index) DO UPDATE SET
                title = excluded.title,
                text = excluded.text,
                embedding = excluded.embedding,
                metadata_json = excluded.metadata_json
            "#,
        )
        .bind(document.source.as_str())
        .bind(&document.source_id)
        .bind(document.chunk_index)
        .bind(&document.title)
        .bind(&document.text)
        .bind(&blob)
        .bind(&metadata_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Nearest-neighbor search by cosine distance, ascending, optionally
    /// restricted to one source so the retrieval engine can apply
    /// per-source thresholds within a single logical query.
    pub async fn search(
        &self,
        query: &[f32],
        k: usize,
        source: Option<Source>,
    ) -> Result<Vec<ScoredDocument>> {
        let rows = match source {
            Some(source) => {
                sqlx::query(
                    "SELECT source, source_id, chunk_index, title, text, embedding, metadata_json \
                     FROM documents WHERE source = ?",
                )
                .bind(source.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT source, source_id, chunk_index, title, text, embedding, metadata_json \
                     FROM documents",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut scored: Vec<ScoredDocument> = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let vec = blob_to_vec(&blob);
            let distance = cosine_distance(query, &vec);

            let source_str: String = row.get("source");
            let source = match Source::parse(&source_str) {
                Some(s) => s,
                // Unknown source tag (schema drift); skip the row
                None => continue,
            };

            let metadata_json: String = row.get("metadata_json");
            let metadata = serde_json::from_str(&metadata_json).unwrap_or_default();

            scored.push(ScoredDocument {
                document: Document {
                    source,
                    source_id: row.get("source_id"),
                    chunk_index: row.get("chunk_index"),
                    title: row.get("title"),
                    text: row.get("text"),
                    metadata,
                },
                distance,
            });
        }

        // Ascending distance; tie-break on the key for determinism
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.source_id.cmp(&b.document.source_id))
                .then(a.document.chunk_index.cmp(&b.document.chunk_index))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// The single nearest stored document of one source, used by fact
    /// deduplication.
    pub async fn nearest(&self, query: &[f32], source: Source) -> Result<Option<ScoredDocument>> {
        Ok(self.search(query, 1, Some(source)).await?.into_iter().next())
    }

    /// Delete every stored row for a source; the full-refresh path.
    pub async fn delete_source(&self, source: Source) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE source = ?")
            .bind(source.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_source(&self, source: Source) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE source = ?")
            .bind(source.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ============ Fact table ============

    /// Insert a new fact row and return its stable integer id.
    pub async fn insert_fact(&self, text: &str) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("INSERT INTO facts (text, status, created_at) VALUES (?, 'pending', ?)")
            .bind(text)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_facts(&self) -> Result<Vec<FactRow>> {
        let rows = sqlx::query("SELECT id, text, status FROM facts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| FactRow {
                id: row.get("id"),
                text: row.get("text"),
                status: row.get("status"),
            })
            .collect())
    }

    pub async fn count_facts(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::migrate;
    use serde_json::Map;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    pub(crate) async fn open_test_store(tmp: &TempDir) -> VectorStore {
        let path = tmp.path().join("kb.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        VectorStore::from_pool(pool)
    }

    pub(crate) fn make_document(source: Source, source_id: &str, text: &str) -> Document {
        Document {
            source,
            source_id: source_id.to_string(),
            chunk_index: 0,
            title: source_id.to_string(),
            text: text.to_string(),
            metadata: Map::new(),
        }
    }

    /// A unit vector at the given cosine distance from `[1, 0, 0]`.
    pub(crate) fn vector_at_distance(distance: f64) -> Vec<f32> {
        let cos = (1.0 - distance) as f32;
        let sin = (1.0 - cos * cos).max(0.0).sqrt();
        vec![cos, sin, 0.0]
    }

    pub(crate) fn query_vector() -> Vec<f32> {
        vec![1.0, 0.0, 0.0]
    }

    #[tokio::test]
    async fn test_upsert_same_key_replaces() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;

        let doc = make_document(Source::Blog, "erg-mode", "Original text.");
        store.upsert(&doc, &vector_at_distance(0.1)).await.unwrap();

        let mut edited = doc.clone();
        edited.text = "Edited text.".to_string();
        store.upsert(&edited, &vector_at_distance(0.2)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&query_vector(), 10, None).await.unwrap();
        assert_eq!(hits[0].document.text, "Edited text.");
        assert!((hits[0].distance - 0.2).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_search_ascending_and_k() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;

        for (id, dist) in [("far", 0.8), ("near", 0.1), ("mid", 0.4)] {
            let doc = make_document(Source::Blog, id, id);
            store.upsert(&doc, &vector_at_distance(dist)).await.unwrap();
        }

        let hits = store.search(&query_vector(), 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.source_id, "near");
        assert_eq!(hits[1].document.source_id, "mid");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_search_source_filter() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;

        let blog = make_document(Source::Blog, "a", "blog text");
        let fact = make_document(Source::Fact, "1", "fact text");
        store.upsert(&blog, &vector_at_distance(0.1)).await.unwrap();
        store.upsert(&fact, &vector_at_distance(0.2)).await.unwrap();

        let hits = store
            .search(&query_vector(), 10, Some(Source::Fact))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.source, Source::Fact);
    }

    #[tokio::test]
    async fn test_nearest() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;

        assert!(store
            .nearest(&query_vector(), Source::Fact)
            .await
            .unwrap()
            .is_none());

        let fact = make_document(Source::Fact, "1", "fact text");
        store.upsert(&fact, &vector_at_distance(0.07)).await.unwrap();

        let hit = store
            .nearest(&query_vector(), Source::Fact)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.document.source_id, "1");
        assert!((hit.distance - 0.07).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_delete_source() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;

        let blog = make_document(Source::Blog, "a", "blog");
        let yt = make_document(Source::Youtube, "v1", "video");
        store.upsert(&blog, &vector_at_distance(0.1)).await.unwrap();
        store.upsert(&yt, &vector_at_distance(0.1)).await.unwrap();

        let deleted = store.delete_source(Source::Blog).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count_source(Source::Blog).await.unwrap(), 0);
        assert_eq!(store.count_source(Source::Youtube).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fact_ids_are_stable_and_increasing() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;

        let first = store.insert_fact("ERG mode is supported.").await.unwrap();
        let second = store.insert_fact("Garmin sync works.").await.unwrap();
        assert!(second > first);

        let facts = store.list_facts().await.unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].id, first);
        assert_eq!(facts[0].status, "pending");
    }
}
