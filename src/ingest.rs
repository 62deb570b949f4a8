//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow: adapter scan → embedding → fact
//! deduplication → upsert. Every per-item failure (embedding, dedup
//! lookup, store write) is counted and the run continues; a batch run
//! over hundreds of items must end with a report, not die on the first
//! flaky API call. Provider calls are batched with a politeness delay to
//! respect external rate limits.

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::adapter::SourceAdapter;
use crate::adapter_blog::BlogAdapter;
use crate::adapter_fact::{fact_document, FactAdapter};
use crate::adapter_forum::{connect_forum_db, ForumQaAdapter, ForumRawAdapter};
use crate::adapter_youtube::YoutubeAdapter;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::models::{IngestionReport, Source};
use crate::store::VectorStore;

/// Ingest everything one adapter produces.
///
/// With `full`, the source's existing rows are deleted first (full
/// refresh); otherwise unchanged items simply overwrite themselves at the
/// same `(source, source_id, chunk_index)` key, so repeated runs are safe.
pub async fn ingest(
    store: &VectorStore,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    adapter: &dyn SourceAdapter,
    full: bool,
    limit: Option<usize>,
) -> Result<IngestionReport> {
    let scan = adapter.scan().await?;
    let mut documents = scan.documents;

    if let Some(limit) = limit {
        documents.truncate(limit);
    }

    let mut report = IngestionReport {
        documents_seen: documents.len() as u64,
        errors: scan.malformed,
        ..Default::default()
    };

    if full {
        store.delete_source(adapter.source()).await?;
    }

    let batch_size = config.embedding.batch_size.max(1);
    let delay = Duration::from_millis(config.embedding.batch_delay_ms);
    let mut first_batch = true;

    for batch in documents.chunks(batch_size) {
        // Pause between provider calls to stay under rate limits
        if !first_batch && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        first_batch = false;

        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let vectors = match provider.embed_batch(&texts).await {
            Ok(vectors) => vectors,
            Err(e) => {
                eprintln!("Warning: embedding batch failed: {}", e);
                report.errors += batch.len() as u64;
                continue;
            }
        };

        for (document, vector) in batch.iter().zip(vectors.iter()) {
            report.embeddings_created += 1;

            // Curated facts must not accumulate near-duplicates: a new
            // fact whose nearest stored fact is within the dedup cutoff
            // is skipped. A hit on the document's own key is just
            // re-ingestion and falls through to the upsert.
            if document.source == Source::Fact {
                match store.nearest(vector, Source::Fact).await {
                    Ok(Some(hit))
                        if hit.distance <= config.retrieval.fact_dedup_distance
                            && hit.document.source_id != document.source_id =>
                    {
                        report.duplicates_skipped += 1;
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!(
                            "Warning: fact dedup check failed for {}: {}",
                            document.source_id, e
                        );
                        report.errors += 1;
                        continue;
                    }
                }
            }

            if let Err(e) = store.upsert(document, vector).await {
                eprintln!(
                    "Warning: failed to store {}/{}: {}",
                    document.source, document.source_id, e
                );
                report.errors += 1;
            } else {
                report.stored += 1;
            }
        }
    }

    Ok(report)
}

/// The result of adding one fact: either a fresh row or the id of an
/// existing near-duplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FactOutcome {
    pub id: i64,
    pub created: bool,
    pub nearest_distance: Option<f64>,
}

/// Add a curated fact from free text.
///
/// The text is embedded and checked against all previously stored facts;
/// at cosine distance ≤ the dedup cutoff the existing fact's id is
/// returned and nothing is inserted. Otherwise a new fact row is created
/// and its document stored.
pub async fn add_fact(
    store: &VectorStore,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    text: &str,
) -> Result<FactOutcome> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Fact text is empty");
    }

    let vector = provider.embed(text).await?;

    let nearest = store.nearest(&vector, Source::Fact).await?;
    if let Some(hit) = &nearest {
        if hit.distance <= config.retrieval.fact_dedup_distance {
            let id = hit
                .document
                .source_id
                .parse::<i64>()
                .with_context(|| format!("Stored fact has non-integer id: {}", hit.document.source_id))?;
            return Ok(FactOutcome {
                id,
                created: false,
                nearest_distance: Some(hit.distance),
            });
        }
    }

    let id = store.insert_fact(text).await?;
    let document = fact_document(id, text, "pending", &config.retrieval);
    store.upsert(&document, &vector).await?;

    Ok(FactOutcome {
        id,
        created: true,
        nearest_distance: nearest.map(|hit| hit.distance),
    })
}

/// CLI entry: build the requested adapters, run each through the
/// pipeline, and print one summary block per source.
pub async fn run_ingest(
    config: &Config,
    source_arg: &str,
    full: bool,
    limit: Option<usize>,
) -> Result<()> {
    let store = VectorStore::open(config).await?;
    let provider = embedding::create_provider(&config.embedding)?;

    let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

    match source_arg {
        "all" => {
            adapters.push(fact_adapter(&store, config));
            if let Some(blog) = &config.sources.blog {
                adapters.push(Box::new(BlogAdapter::new(
                    blog.clone(),
                    config.chunking.clone(),
                    config.retrieval.clone(),
                )));
            }
            if let Some(forum) = &config.sources.forum {
                let pool = connect_forum_db(forum).await?;
                adapters.push(Box::new(ForumQaAdapter::new(
                    pool.clone(),
                    forum.qa_table.clone(),
                    config.retrieval.clone(),
                )));
                adapters.push(Box::new(ForumRawAdapter::new(
                    pool,
                    forum.topics_table.clone(),
                    config.retrieval.clone(),
                )));
            }
            if let Some(youtube) = &config.sources.youtube {
                adapters.push(Box::new(YoutubeAdapter::new(
                    youtube.clone(),
                    config.retrieval.clone(),
                )));
            }
        }
        "fact" => adapters.push(fact_adapter(&store, config)),
        "blog" => {
            let blog = config
                .sources
                .blog
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Blog source not configured"))?;
            adapters.push(Box::new(BlogAdapter::new(
                blog.clone(),
                config.chunking.clone(),
                config.retrieval.clone(),
            )));
        }
        "youtube" => {
            let youtube = config
                .sources
                .youtube
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("YouTube source not configured"))?;
            adapters.push(Box::new(YoutubeAdapter::new(
                youtube.clone(),
                config.retrieval.clone(),
            )));
        }
        "forum_qa" | "forum_raw" => {
            let forum = config
                .sources
                .forum
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Forum source not configured"))?;
            let pool = connect_forum_db(forum).await?;
            if source_arg == "forum_qa" {
                adapters.push(Box::new(ForumQaAdapter::new(
                    pool,
                    forum.qa_table.clone(),
                    config.retrieval.clone(),
                )));
            } else {
                adapters.push(Box::new(ForumRawAdapter::new(
                    pool,
                    forum.topics_table.clone(),
                    config.retrieval.clone(),
                )));
            }
        }
        other => bail!(
            "Unknown source: '{}'. Available: all, fact, blog, youtube, forum_qa, forum_raw",
            other
        ),
    }

    for adapter in &adapters {
        let report = ingest(&store, provider.as_ref(), config, adapter.as_ref(), full, limit).await?;
        print_report(adapter.source(), &report);
    }
    println!("ok");

    store.close().await;
    Ok(())
}

fn fact_adapter(store: &VectorStore, config: &Config) -> Box<dyn SourceAdapter> {
    Box::new(FactAdapter::new(
        store.pool().clone(),
        config.retrieval.clone(),
    ))
}

fn print_report(source: Source, report: &IngestionReport) {
    println!("ingest {}", source);
    println!("  documents seen: {}", report.documents_seen);
    println!("  embeddings created: {}", report.embeddings_created);
    println!("  stored: {}", report.stored);
    println!("  duplicates skipped: {}", report.duplicates_skipped);
    println!("  errors: {}", report.errors);
}

/// CLI entry for `kb fact add`.
pub async fn run_fact_add(config: &Config, text: &str) -> Result<()> {
    let store = VectorStore::open(config).await?;
    let provider = embedding::create_provider(&config.embedding)?;

    let outcome = add_fact(&store, provider.as_ref(), config, text).await?;
    if outcome.created {
        println!("fact {} (new)", outcome.id);
    } else {
        println!(
            "fact {} (existing, distance {:.2})",
            outcome.id,
            outcome.nearest_distance.unwrap_or_default()
        );
    }

    store.close().await;
    Ok(())
}
