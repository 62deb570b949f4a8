//! YouTube transcript adapter: a directory of JSON transcript files.
//!
//! One document per video. The transcript's `video_id` is the stable
//! `source_id` (falling back to the filename stem); the text is the
//! segment texts joined in order. Transcripts with no segments carry
//! nothing worth embedding and are counted as malformed.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::adapter::{base_metadata, derive_source_id, ScanReport, SourceAdapter};
use crate::config::{RetrievalConfig, YoutubeSourceConfig};
use crate::models::{Document, Source};

pub struct YoutubeAdapter {
    config: YoutubeSourceConfig,
    retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize)]
struct Transcript {
    video_id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    text: String,
    #[serde(default)]
    #[allow(dead_code)]
    start: f64,
}

impl YoutubeAdapter {
    pub fn new(config: YoutubeSourceConfig, retrieval: RetrievalConfig) -> Self {
        Self { config, retrieval }
    }

    fn document_for_file(&self, stem: &str, content: &str) -> Result<Document> {
        let transcript: Transcript = serde_json::from_str(content)
            .map_err(|e| anyhow::anyhow!("invalid transcript JSON: {}", e))?;

        let text = transcript
            .segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            bail!("transcript has no segments");
        }

        let source_id = derive_source_id(transcript.video_id.as_deref().unwrap_or(stem));
        let title = transcript
            .title
            .clone()
            .unwrap_or_else(|| stem.to_string());

        let mut metadata = base_metadata(Source::Youtube, &self.retrieval);
        metadata.insert(
            "segment_count".to_string(),
            Value::from(transcript.segments.len()),
        );
        if let Some(url) = &transcript.url {
            metadata.insert("url".to_string(), Value::String(url.clone()));
        }

        Ok(Document {
            source: Source::Youtube,
            source_id,
            chunk_index: 0,
            title,
            text,
            metadata,
        })
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn source(&self) -> Source {
        Source::Youtube
    }

    fn description(&self) -> &str {
        "YouTube transcript JSON files"
    }

    async fn scan(&self) -> Result<ScanReport> {
        let root = &self.config.root;
        if !root.exists() {
            bail!("YouTube source root does not exist: {}", root.display());
        }

        let mut report = ScanReport::default();

        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Warning: could not read {}: {}", path.display(), e);
                    report.malformed += 1;
                    continue;
                }
            };

            match self.document_for_file(&stem, &content) {
                Ok(document) => report.documents.push(document),
                Err(e) => {
                    eprintln!("Warning: skipping {}: {}", path.display(), e);
                    report.malformed += 1;
                }
            }
        }

        // Sort for deterministic ordering
        report.documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));

        Ok(report)
    }
}
