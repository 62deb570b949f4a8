//! Fact adapter: scans this store's own `facts` table so curated facts
//! can be re-embedded (e.g. after an embedding model change).
//!
//! New facts enter through `kb fact add` (see the ingestion pipeline's
//! `add_fact`), which deduplicates before inserting; this adapter only
//! replays what the table already holds.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::adapter::{base_metadata, ScanReport, SourceAdapter};
use crate::config::RetrievalConfig;
use crate::models::{Document, Source};

pub struct FactAdapter {
    pool: SqlitePool,
    retrieval: RetrievalConfig,
}

impl FactAdapter {
    pub fn new(pool: SqlitePool, retrieval: RetrievalConfig) -> Self {
        Self { pool, retrieval }
    }
}

/// Citation label for a fact: its text, truncated to a display-friendly
/// length.
pub(crate) fn fact_title(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= 80 {
        return text.to_string();
    }
    let mut title: String = text.chars().take(79).collect();
    title.push('…');
    title
}

/// Build the vector-store document for one fact row.
pub(crate) fn fact_document(
    id: i64,
    text: &str,
    status: &str,
    retrieval: &RetrievalConfig,
) -> Document {
    let mut metadata = base_metadata(Source::Fact, retrieval);
    metadata.insert("status".to_string(), Value::String(status.to_string()));

    Document {
        source: Source::Fact,
        source_id: id.to_string(),
        chunk_index: 0,
        title: fact_title(text),
        text: text.trim().to_string(),
        metadata,
    }
}

#[async_trait]
impl SourceAdapter for FactAdapter {
    fn source(&self) -> Source {
        Source::Fact
    }

    fn description(&self) -> &str {
        "Curated facts from this store's fact table"
    }

    async fn scan(&self) -> Result<ScanReport> {
        let rows = sqlx::query("SELECT id, text, status FROM facts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut report = ScanReport::default();

        for row in &rows {
            let id: i64 = row.get("id");
            let text: String = row.get("text");
            let status: String = row.get("status");

            if text.trim().is_empty() {
                eprintln!("Warning: skipping fact {}: empty text", id);
                report.malformed += 1;
                continue;
            }

            report
                .documents
                .push(fact_document(id, &text, &status, &self.retrieval));
        }

        Ok(report)
    }
}
