//! Source adapter abstraction and source-type policy.
//!
//! Every content source (blog directory, transcript directory, forum
//! database, fact table) implements [`SourceAdapter`]: produce a batch of
//! normalized [`Document`]s from source-specific input. The ingestion
//! pipeline is the only consumer; it treats all adapters identically.
//!
//! This module also owns the priority/threshold policy table. Thresholds
//! are assigned by source type, not per document — curated, high-signal
//! sources get tight cutoffs so they dominate retrieval, while noisy crowd
//! discussion only surfaces when it is a close match or the caller opts
//! into expanded mode.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::RetrievalConfig;
use crate::models::{Document, Priority, RetrievalMode, Source};

/// Storage keys cap `source_id` at 95 characters.
pub const MAX_SOURCE_ID_LEN: usize = 95;

/// The outcome of one adapter scan: normalized documents plus the number
/// of malformed source items that were skipped.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub documents: Vec<Document>,
    pub malformed: u64,
}

/// A content source that produces documents for ingestion.
///
/// Implementations must assign `source`, a stable `source_id`, and the
/// policy metadata (via [`base_metadata`]) to every document. They must
/// never fabricate identifiers: when the underlying item has no stable id,
/// derive one deterministically from its filename stem with
/// [`derive_source_id`] so repeated runs produce the same keys.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The source type this adapter produces.
    fn source(&self) -> Source;

    /// One-line description, used in `kb sources` output.
    fn description(&self) -> &str;

    /// Scan the source and return all documents to ingest.
    ///
    /// Malformed items (unparseable frontmatter, transcripts with no
    /// segments, empty rows) are skipped and counted, never fatal to the
    /// scan.
    async fn scan(&self) -> Result<ScanReport>;
}

/// Default priority tier per source type.
pub fn default_priority(source: Source) -> Priority {
    match source {
        Source::Fact => Priority::Critical,
        Source::Blog => Priority::High,
        Source::ForumQa => Priority::High,
        Source::Youtube => Priority::Medium,
        Source::ForumRaw => Priority::Low,
    }
}

/// Build the required retrieval-control metadata for a document.
///
/// Stores the source's priority and its precision-mode threshold (the
/// policy default at ingestion time) so downstream consumers can cite and
/// weight results without consulting live config.
pub fn base_metadata(source: Source, retrieval: &RetrievalConfig) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(
        "priority".to_string(),
        Value::String(default_priority(source).as_str().to_string()),
    );
    metadata.insert(
        "similarity_threshold".to_string(),
        Value::from(retrieval.threshold(source, RetrievalMode::Precision)),
    );
    metadata
}

/// Derive a stable `source_id` from a filename stem or other free-form
/// identifier, truncated to [`MAX_SOURCE_ID_LEN`] on a character boundary.
pub fn derive_source_id(stem: &str) -> String {
    let trimmed = stem.trim();
    if trimmed.chars().count() <= MAX_SOURCE_ID_LEN {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_SOURCE_ID_LEN).collect()
}
