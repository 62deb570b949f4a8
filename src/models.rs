//! Core data models for the knowledge base.
//!
//! These types represent the documents, retrieval results, and ingestion
//! reports that flow through the embedding and retrieval pipeline.

use std::fmt;

use serde_json::{Map, Value};

/// Content origin of a stored document.
///
/// The source determines the default priority tier and the similarity
/// thresholds applied during retrieval: curated facts are strict, raw
/// forum discussion is loose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Structured question/answer pairs extracted from forum topics.
    ForumQa,
    /// Unstructured forum discussion threads.
    ForumRaw,
    /// Blog articles (markdown with YAML frontmatter).
    Blog,
    /// YouTube video transcripts.
    Youtube,
    /// Curated free-text facts.
    Fact,
}

impl Source {
    /// All sources in retrieval priority order (most authoritative first).
    pub const ALL: [Source; 5] = [
        Source::Fact,
        Source::Blog,
        Source::ForumQa,
        Source::Youtube,
        Source::ForumRaw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::ForumQa => "forum_qa",
            Source::ForumRaw => "forum_raw",
            Source::Blog => "blog",
            Source::Youtube => "youtube",
            Source::Fact => "fact",
        }
    }

    pub fn parse(s: &str) -> Option<Source> {
        match s {
            "forum_qa" => Some(Source::ForumQa),
            "forum_raw" => Some(Source::ForumRaw),
            "blog" => Some(Source::Blog),
            "youtube" => Some(Source::Youtube),
            "fact" => Some(Source::Fact),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tier assigned to a document by source-type policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold policy selected by the caller per query.
///
/// Precision keeps the tight per-source thresholds; expanded relaxes them
/// to fill gaps when a query returns too few results. The engine never
/// escalates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Precision,
    Expanded,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Precision => "precision",
            RetrievalMode::Expanded => "expanded",
        }
    }

    pub fn parse(s: &str) -> Option<RetrievalMode> {
        match s {
            "precision" => Some(RetrievalMode::Precision),
            "expanded" => Some(RetrievalMode::Expanded),
            _ => None,
        }
    }
}

/// The unit of ingestion: one source item, or one chunk of a long item.
///
/// `(source, source_id, chunk_index)` uniquely identifies the stored row;
/// re-ingesting the same triple updates it in place. The embedding is
/// always computed from `text`, never from `title` or `metadata`.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: Source,
    /// Stable identifier within the source (topic id, filename stem,
    /// video id, fact row id). At most 95 characters.
    pub source_id: String,
    /// 0-based position when a source item is split into chunks; 0 when
    /// unchunked.
    pub chunk_index: i64,
    /// Human-readable label used for citation display.
    pub title: String,
    /// Content body; this is what gets embedded.
    pub text: String,
    /// Open key-value map with source-specific fields plus the required
    /// `priority` and `similarity_threshold` retrieval-control fields.
    pub metadata: Map<String, Value>,
}

/// A stored document paired with its cosine distance to a query vector.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub distance: f64,
}

/// One ranked retrieval hit. Not persisted.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub source: Source,
    pub source_id: String,
    pub title: String,
    pub text: String,
    pub metadata: Map<String, Value>,
    /// Cosine distance to the query vector (0 = identical direction).
    pub distance: f64,
}

/// A curated fact row. The integer id is the stable reference handed to
/// the external review workflow.
#[derive(Debug, Clone)]
pub struct FactRow {
    pub id: i64,
    pub text: String,
    pub status: String,
}

/// Summary of one ingestion run. Printed at the end of every batch so
/// partial success is visible instead of silent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub documents_seen: u64,
    pub embeddings_created: u64,
    pub stored: u64,
    pub duplicates_skipped: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_roundtrip() {
        for source in Source::ALL {
            assert_eq!(Source::parse(source.as_str()), Some(source));
        }
        assert_eq!(Source::parse("reddit"), None);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(RetrievalMode::parse("precision"), Some(RetrievalMode::Precision));
        assert_eq!(RetrievalMode::parse("expanded"), Some(RetrievalMode::Expanded));
        assert_eq!(RetrievalMode::parse("auto"), None);
    }
}
