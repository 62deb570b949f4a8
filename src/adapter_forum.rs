//! Forum adapters: structured Q&A pairs and raw discussion threads read
//! from the forum collaborator's SQLite database.
//!
//! The forum database is consumed read-only; table names come from config
//! (validated to identifier characters at load time). Topic ids are the
//! stable `source_id`s, so repeated runs upsert in place.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::adapter::{base_metadata, ScanReport, SourceAdapter};
use crate::config::{ForumSourceConfig, RetrievalConfig};
use crate::models::{Document, Source};

/// Open the forum collaborator database read-only. Fails fast when the
/// file is missing — there is nothing meaningful to ingest without it.
pub async fn connect_forum_db(config: &ForumSourceConfig) -> Result<SqlitePool> {
    if !config.db_path.exists() {
        bail!(
            "Forum database does not exist: {}",
            config.db_path.display()
        );
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.db_path.display()))?
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    Ok(pool)
}

// ============ Structured Q&A ============

pub struct ForumQaAdapter {
    pool: SqlitePool,
    table: String,
    retrieval: RetrievalConfig,
}

impl ForumQaAdapter {
    pub fn new(pool: SqlitePool, table: String, retrieval: RetrievalConfig) -> Self {
        Self {
            pool,
            table,
            retrieval,
        }
    }
}

#[async_trait]
impl SourceAdapter for ForumQaAdapter {
    fn source(&self) -> Source {
        Source::ForumQa
    }

    fn description(&self) -> &str {
        "Structured forum question/answer pairs"
    }

    async fn scan(&self) -> Result<ScanReport> {
        // Table name is config-validated to identifier characters
        let sql = format!(
            "SELECT topic_id, question, answer, category, views, posts FROM {} ORDER BY topic_id",
            self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut report = ScanReport::default();

        for row in &rows {
            let topic_id: i64 = row.get("topic_id");
            let question: Option<String> = row.get("question");
            let answer: Option<String> = row.get("answer");

            let (question, answer) = match (question, answer) {
                (Some(q), Some(a)) if !q.trim().is_empty() && !a.trim().is_empty() => (q, a),
                _ => {
                    eprintln!("Warning: skipping Q&A topic {}: empty question or answer", topic_id);
                    report.malformed += 1;
                    continue;
                }
            };

            let mut metadata = base_metadata(Source::ForumQa, &self.retrieval);
            if let Some(category) = row.get::<Option<String>, _>("category") {
                metadata.insert("category".to_string(), Value::String(category));
            }
            if let Some(views) = row.get::<Option<i64>, _>("views") {
                metadata.insert("views".to_string(), Value::from(views));
            }
            if let Some(posts) = row.get::<Option<i64>, _>("posts") {
                metadata.insert("post_count".to_string(), Value::from(posts));
            }

            report.documents.push(Document {
                source: Source::ForumQa,
                source_id: topic_id.to_string(),
                chunk_index: 0,
                title: question.trim().to_string(),
                text: format!("Q: {}\n\nA: {}", question.trim(), answer.trim()),
                metadata,
            });
        }

        Ok(report)
    }
}

// ============ Raw discussion threads ============

pub struct ForumRawAdapter {
    pool: SqlitePool,
    table: String,
    retrieval: RetrievalConfig,
}

impl ForumRawAdapter {
    pub fn new(pool: SqlitePool, table: String, retrieval: RetrievalConfig) -> Self {
        Self {
            pool,
            table,
            retrieval,
        }
    }
}

/// The shape of a raw topic's `raw_json` column.
#[derive(Debug, Deserialize)]
struct RawTopic {
    #[serde(default)]
    posts: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(default)]
    body: String,
}

#[async_trait]
impl SourceAdapter for ForumRawAdapter {
    fn source(&self) -> Source {
        Source::ForumRaw
    }

    fn description(&self) -> &str {
        "Raw forum discussion threads"
    }

    async fn scan(&self) -> Result<ScanReport> {
        let sql = format!(
            "SELECT topic_id, title, views, raw_json FROM {} ORDER BY topic_id",
            self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut report = ScanReport::default();

        for row in &rows {
            let topic_id: i64 = row.get("topic_id");
            let title: String = row
                .get::<Option<String>, _>("title")
                .unwrap_or_default();
            let raw_json: String = row
                .get::<Option<String>, _>("raw_json")
                .unwrap_or_default();

            let topic: RawTopic = match serde_json::from_str(&raw_json) {
                Ok(topic) => topic,
                Err(e) => {
                    eprintln!("Warning: skipping raw topic {}: invalid JSON: {}", topic_id, e);
                    report.malformed += 1;
                    continue;
                }
            };

            let bodies: Vec<&str> = topic
                .posts
                .iter()
                .map(|p| p.body.trim())
                .filter(|b| !b.is_empty())
                .collect();

            if bodies.is_empty() {
                eprintln!("Warning: skipping raw topic {}: no posts", topic_id);
                report.malformed += 1;
                continue;
            }

            let mut text = title.trim().to_string();
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(&bodies.join("\n\n"));

            let mut metadata = base_metadata(Source::ForumRaw, &self.retrieval);
            metadata.insert("post_count".to_string(), Value::from(bodies.len()));
            if let Some(views) = row.get::<Option<i64>, _>("views") {
                metadata.insert("views".to_string(), Value::from(views));
            }

            report.documents.push(Document {
                source: Source::ForumRaw,
                source_id: topic_id.to_string(),
                chunk_index: 0,
                title: title.trim().to_string(),
                text,
                metadata,
            });
        }

        Ok(report)
    }
}
