//! Priority-weighted retrieval engine.
//!
//! Callers supply one or more paraphrases of the same information need;
//! each paraphrase is embedded and searched per source with that source's
//! threshold for the selected mode. Candidates that survive the cutoffs
//! are merged, deduplicated by text prefix (paraphrased queries routinely
//! surface the same passage), and returned sorted by ascending cosine
//! distance — which biases the result set toward curated, tight-threshold
//! sources while still letting forum chatter through when it is a very
//! close match.

use anyhow::{bail, Result};
use std::collections::HashSet;

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::models::{RetrievalMode, RetrievalResult, Source};
use crate::store::VectorStore;

/// Candidates sharing this many leading characters of text are the same
/// passage.
const DEDUP_PREFIX_CHARS: usize = 200;

/// Retrieve ranked, threshold-filtered results for a set of query
/// paraphrases.
///
/// A storage failure on one source-filtered search is warned about and
/// skipped — partial results are preferable to none. An embedding failure
/// on one paraphrase skips that paraphrase; the call only fails when no
/// paraphrase could be embedded at all.
pub async fn retrieve(
    store: &VectorStore,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    queries: &[String],
    mode: RetrievalMode,
    k_per_query: usize,
) -> Result<Vec<RetrievalResult>> {
    if queries.is_empty() {
        return Ok(Vec::new());
    }

    let mut query_vectors = Vec::with_capacity(queries.len());
    for query in queries {
        match provider.embed(query).await {
            Ok(vector) => query_vectors.push(vector),
            Err(e) => eprintln!("Warning: could not embed query '{}': {}", query, e),
        }
    }
    if query_vectors.is_empty() {
        bail!("No query could be embedded");
    }

    let mut candidates: Vec<RetrievalResult> = Vec::new();

    for vector in &query_vectors {
        for source in Source::ALL {
            let threshold = config.retrieval.threshold(source, mode);

            let hits = match store.search(vector, k_per_query, Some(source)).await {
                Ok(hits) => hits,
                Err(e) => {
                    eprintln!("Warning: search failed for source {}: {}", source, e);
                    continue;
                }
            };

            for hit in hits {
                if hit.distance <= threshold {
                    candidates.push(RetrievalResult {
                        source: hit.document.source,
                        source_id: hit.document.source_id,
                        title: hit.document.title,
                        text: hit.document.text,
                        metadata: hit.document.metadata,
                        distance: hit.distance,
                    });
                }
            }
        }
    }

    // Keep the first occurrence of each passage; per-query candidates
    // arrive in ascending-distance order, so the survivor tends to be
    // the closest match.
    let mut seen: HashSet<String> = HashSet::new();
    let mut results: Vec<RetrievalResult> = Vec::new();
    for candidate in candidates {
        if seen.insert(prefix_key(&candidate.text)) {
            results.push(candidate);
        }
    }

    // Ascending distance; tie-break for determinism
    results.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source.as_str().cmp(b.source.as_str()))
            .then_with(|| a.source_id.cmp(&b.source_id))
    });

    Ok(results)
}

fn prefix_key(text: &str) -> String {
    text.chars().take(DEDUP_PREFIX_CHARS).collect()
}

/// CLI entry: run a retrieval and print the ranked results.
pub async fn run_retrieve(
    config: &Config,
    query: &str,
    extra_queries: &[String],
    mode_str: &str,
    k: Option<usize>,
) -> Result<()> {
    let Some(mode) = RetrievalMode::parse(mode_str) else {
        bail!(
            "Unknown retrieval mode: {}. Use precision or expanded.",
            mode_str
        );
    };

    if !config.embedding.is_enabled() {
        bail!("Retrieval requires embeddings. Set [embedding] provider in config.");
    }

    let store = VectorStore::open(config).await?;
    let provider = embedding::create_provider(&config.embedding)?;

    let mut queries = vec![query.to_string()];
    queries.extend(extra_queries.iter().cloned());
    let k = k.unwrap_or(config.retrieval.k_per_query);

    let results = retrieve(&store, provider.as_ref(), config, &queries, mode, k).await?;

    if results.is_empty() {
        println!("No results.");
        store.close().await;
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let priority = result
            .metadata
            .get("priority")
            .and_then(|v| v.as_str())
            .unwrap_or("-");

        println!(
            "{}. [{:.2}] {} / {}",
            i + 1,
            result.distance,
            result.source,
            result.title
        );
        println!("    priority: {}", priority);
        println!("    excerpt: \"{}\"", excerpt(&result.text));
        println!();
    }

    store.close().await;
    Ok(())
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= 160 {
        return flat.to_string();
    }
    let mut cut: String = flat.chars().take(159).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DbConfig, Thresholds};
    use crate::embedding::StubProvider;
    use crate::store::tests::{make_document, open_test_store, query_vector, vector_at_distance};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config() -> Config {
        Config {
            db: DbConfig {
                path: PathBuf::from("unused"),
            },
            embedding: Default::default(),
            retrieval: Default::default(),
            chunking: Default::default(),
            sources: Default::default(),
        }
    }

    fn provider_for(entries: &[(&str, Vec<f32>)]) -> StubProvider {
        let vectors: HashMap<String, Vec<f32>> = entries
            .iter()
            .map(|(text, vec)| (text.to_string(), vec.clone()))
            .collect();
        StubProvider { vectors }
    }

    fn queries(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_mode_thresholds_gate_forum_raw() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;
        let config = test_config();

        // Nearest forum_raw match sits at distance 0.72: outside the
        // precision cutoff (0.6), inside the expanded one (0.85).
        let doc = make_document(Source::ForumRaw, "7", "Thread about trainer calibration.");
        store.upsert(&doc, &vector_at_distance(0.72)).await.unwrap();

        let provider = provider_for(&[("trainer calibration", query_vector())]);
        let q = queries(&["trainer calibration"]);

        let precision = retrieve(&store, &provider, &config, &q, RetrievalMode::Precision, 8)
            .await
            .unwrap();
        assert!(precision.is_empty());

        let expanded = retrieve(&store, &provider, &config, &q, RetrievalMode::Expanded, 8)
            .await
            .unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].source, Source::ForumRaw);
    }

    #[tokio::test]
    async fn test_paraphrased_queries_dedup_same_passage() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;
        let config = test_config();

        let doc = make_document(Source::Blog, "garmin-sync", "How Garmin sync works.");
        store.upsert(&doc, &vector_at_distance(0.2)).await.unwrap();

        let provider = provider_for(&[
            ("garmin sync", query_vector()),
            ("sync workouts to garmin", query_vector()),
        ]);
        let q = queries(&["garmin sync", "sync workouts to garmin"]);

        let results = retrieve(&store, &provider, &config, &q, RetrievalMode::Precision, 8)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_id, "garmin-sync");
    }

    #[tokio::test]
    async fn test_results_sorted_ascending_by_distance() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;
        let config = test_config();

        for (id, dist) in [("far", 0.55), ("near", 0.1), ("mid", 0.3)] {
            let doc = make_document(Source::ForumQa, id, id);
            store.upsert(&doc, &vector_at_distance(dist)).await.unwrap();
        }

        let provider = provider_for(&[("q", query_vector())]);
        let results = retrieve(
            &store,
            &provider,
            &config,
            &queries(&["q"]),
            RetrievalMode::Expanded,
            8,
        )
        .await
        .unwrap();

        // forum_qa cutoff is 0.4 in both modes; "far" is filtered out
        assert_eq!(results.len(), 2);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(results[0].source_id, "near");
    }

    #[tokio::test]
    async fn test_three_source_scenario_with_tuned_policy() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;

        // Garmin-sync documents in three sources at 0.35 / 0.55 / 0.78
        let fact = make_document(Source::Fact, "1", "Workouts sync to Garmin automatically.");
        let blog = make_document(Source::Blog, "garmin-sync", "Garmin sync setup guide.");
        let raw = make_document(Source::ForumRaw, "7", "Forum thread about Garmin sync.");
        store.upsert(&fact, &vector_at_distance(0.35)).await.unwrap();
        store.upsert(&blog, &vector_at_distance(0.55)).await.unwrap();
        store.upsert(&raw, &vector_at_distance(0.78)).await.unwrap();

        // Thresholds are tunable policy; this deployment runs a looser
        // precision tier for curated sources.
        let mut config = test_config();
        config.retrieval.precision = Thresholds {
            fact: 0.4,
            blog: 0.6,
            forum_qa: 0.4,
            youtube: 0.6,
            forum_raw: 0.6,
        };
        config.retrieval.expanded = Thresholds {
            fact: 0.5,
            blog: 0.75,
            forum_qa: 0.4,
            youtube: 0.8,
            forum_raw: 0.85,
        };

        let provider = provider_for(&[("garmin sync", query_vector())]);
        let q = queries(&["garmin sync"]);

        let precision = retrieve(&store, &provider, &config, &q, RetrievalMode::Precision, 8)
            .await
            .unwrap();
        let precision_sources: Vec<Source> = precision.iter().map(|r| r.source).collect();
        assert_eq!(precision_sources, vec![Source::Fact, Source::Blog]);

        let expanded = retrieve(&store, &provider, &config, &q, RetrievalMode::Expanded, 8)
            .await
            .unwrap();
        let expanded_sources: Vec<Source> = expanded.iter().map(|r| r.source).collect();
        assert_eq!(
            expanded_sources,
            vec![Source::Fact, Source::Blog, Source::ForumRaw]
        );
        assert_eq!(expanded[0].source, Source::Fact);
    }

    #[tokio::test]
    async fn test_failed_paraphrase_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;
        let config = test_config();

        let doc = make_document(Source::Blog, "a", "Article text.");
        store.upsert(&doc, &vector_at_distance(0.1)).await.unwrap();

        // Only one of the two paraphrases is embeddable
        let provider = provider_for(&[("good query", query_vector())]);
        let q = queries(&["good query", "bad query"]);

        let results = retrieve(&store, &provider, &config, &q, RetrievalMode::Precision, 8)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_all_paraphrases_failing_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;
        let config = test_config();

        let provider = provider_for(&[]);
        let result = retrieve(
            &store,
            &provider,
            &config,
            &queries(&["bad query"]),
            RetrievalMode::Precision,
            8,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_queries_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let store = open_test_store(&tmp).await;
        let config = test_config();

        let provider = provider_for(&[]);
        let results = retrieve(&store, &provider, &config, &[], RetrievalMode::Precision, 8)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_prefix_key_bounds() {
        let short = prefix_key("short text");
        assert_eq!(short, "short text");

        let long = "a".repeat(500);
        assert_eq!(prefix_key(&long).chars().count(), DEDUP_PREFIX_CHARS);
    }
}
