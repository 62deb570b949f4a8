//! Blog article adapter: a directory of markdown files with YAML
//! frontmatter.
//!
//! Each file becomes one document, or one document per heading section when
//! the article exceeds the chunking budget. The filename stem is the stable
//! `source_id`, so an edited article overwrites its own rows on the next
//! run. Files with unparseable frontmatter are skipped and counted as
//! malformed; files with no frontmatter at all ingest whole-body with the
//! stem as title.

use anyhow::{bail, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::adapter::{base_metadata, derive_source_id, ScanReport, SourceAdapter};
use crate::chunk::split_article;
use crate::config::{BlogSourceConfig, ChunkingConfig, RetrievalConfig};
use crate::models::{Document, Source};

pub struct BlogAdapter {
    config: BlogSourceConfig,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
}

/// YAML frontmatter fields we carry into document metadata. Unknown keys
/// are ignored.
#[derive(Debug, Deserialize, Default)]
struct Frontmatter {
    title: Option<String>,
    category: Option<String>,
    tags: Option<Vec<String>>,
    url: Option<String>,
    date: Option<String>,
}

impl BlogAdapter {
    pub fn new(
        config: BlogSourceConfig,
        chunking: ChunkingConfig,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            config,
            chunking,
            retrieval,
        }
    }

    fn documents_for_file(&self, stem: &str, content: &str) -> Result<Vec<Document>> {
        let (frontmatter, body) = parse_frontmatter(content)?;
        let frontmatter = frontmatter.unwrap_or_default();

        let source_id = derive_source_id(stem);
        let title = frontmatter
            .title
            .clone()
            .unwrap_or_else(|| stem.to_string());

        let sections = split_article(body, self.chunking.max_chars);
        let chunked = sections.len() > 1;

        let mut documents = Vec::with_capacity(sections.len());
        for (index, section) in sections.into_iter().enumerate() {
            let mut metadata = base_metadata(Source::Blog, &self.retrieval);
            if let Some(category) = &frontmatter.category {
                metadata.insert("category".to_string(), Value::String(category.clone()));
            }
            if let Some(tags) = &frontmatter.tags {
                metadata.insert(
                    "tags".to_string(),
                    Value::Array(tags.iter().cloned().map(Value::String).collect()),
                );
            }
            if let Some(url) = &frontmatter.url {
                metadata.insert("url".to_string(), Value::String(url.clone()));
            }
            if let Some(date) = &frontmatter.date {
                metadata.insert("date".to_string(), Value::String(date.clone()));
            }
            if chunked {
                if let Some(heading) = &section.heading {
                    metadata.insert("section".to_string(), Value::String(heading.clone()));
                }
            }

            documents.push(Document {
                source: Source::Blog,
                source_id: source_id.clone(),
                chunk_index: index as i64,
                title: title.clone(),
                text: section.text,
                metadata,
            });
        }

        Ok(documents)
    }
}

#[async_trait]
impl SourceAdapter for BlogAdapter {
    fn source(&self) -> Source {
        Source::Blog
    }

    fn description(&self) -> &str {
        "Markdown blog articles with YAML frontmatter"
    }

    async fn scan(&self) -> Result<ScanReport> {
        let root = &self.config.root;
        if !root.exists() {
            bail!("Blog source root does not exist: {}", root.display());
        }

        let include_set = build_globset(&self.config.include_globs)?;
        let exclude_set = build_globset(&self.config.exclude_globs)?;

        let mut report = ScanReport::default();

        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
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

            match self.documents_for_file(&stem, &content) {
                Ok(documents) => report.documents.extend(documents),
                Err(e) => {
                    eprintln!("Warning: skipping {}: {}", path.display(), e);
                    report.malformed += 1;
                }
            }
        }

        // Sort for deterministic ordering
        report
            .documents
            .sort_by(|a, b| (a.source_id.as_str(), a.chunk_index).cmp(&(b.source_id.as_str(), b.chunk_index)));

        Ok(report)
    }
}

/// Split a markdown file into its YAML frontmatter (if any) and body.
///
/// Returns an error when a frontmatter block is present but does not parse
/// as YAML — those files are editor mistakes, not content.
fn parse_frontmatter(content: &str) -> Result<(Option<Frontmatter>, &str)> {
    let Some(rest) = content.strip_prefix("---\n").or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok((None, content));
    };

    let Some(end) = rest.find("\n---") else {
        bail!("unterminated frontmatter block");
    };

    let yaml = &rest[..end];
    let after = &rest[end + 4..];
    let body = after.strip_prefix('\n').unwrap_or(after);

    let frontmatter: Frontmatter =
        serde_yaml::from_str(yaml).map_err(|e| anyhow::anyhow!("invalid frontmatter: {}", e))?;

    Ok((Some(frontmatter), body))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlogSourceConfig, ChunkingConfig, RetrievalConfig};
    use std::fs;
    use tempfile::TempDir;

    fn adapter_for(root: &std::path::Path, max_chars: usize) -> BlogAdapter {
        BlogAdapter::new(
            BlogSourceConfig {
                root: root.to_path_buf(),
                include_globs: vec!["**/*.md".to_string()],
                exclude_globs: vec![],
            },
            ChunkingConfig { max_chars },
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_scan_reads_frontmatter() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("erg-mode.md"),
            "---\ntitle: ERG Mode Explained\ncategory: training\ntags: [erg, trainer]\n---\n\nERG mode holds your target power.\n",
        )
        .unwrap();

        let report = adapter_for(tmp.path(), 6000).scan().await.unwrap();
        assert_eq!(report.malformed, 0);
        assert_eq!(report.documents.len(), 1);

        let doc = &report.documents[0];
        assert_eq!(doc.source, Source::Blog);
        assert_eq!(doc.source_id, "erg-mode");
        assert_eq!(doc.chunk_index, 0);
        assert_eq!(doc.title, "ERG Mode Explained");
        assert_eq!(doc.text, "ERG mode holds your target power.");
        assert_eq!(doc.metadata["category"], "training");
        assert_eq!(doc.metadata["priority"], "high");
    }

    #[tokio::test]
    async fn test_file_without_frontmatter_uses_stem() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("plain-post.md"), "Just body text.\n").unwrap();

        let report = adapter_for(tmp.path(), 6000).scan().await.unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].title, "plain-post");
        assert_eq!(report.documents[0].text, "Just body text.");
    }

    #[tokio::test]
    async fn test_broken_frontmatter_counts_malformed() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("broken.md"),
            "---\ntitle: [unclosed\n---\n\nBody.\n",
        )
        .unwrap();
        fs::write(tmp.path().join("good.md"), "---\ntitle: Fine\n---\n\nBody.\n").unwrap();

        let report = adapter_for(tmp.path(), 6000).scan().await.unwrap();
        assert_eq!(report.malformed, 1);
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].source_id, "good");
    }

    #[tokio::test]
    async fn test_long_article_chunks_with_stable_keys() {
        let tmp = TempDir::new().unwrap();
        let body = "Intro before headings.\n\n# Setup\n\nSetup details.\n\n# Calibration\n\nCalibration details.\n";
        fs::write(
            tmp.path().join("trainer-guide.md"),
            format!("---\ntitle: Trainer Guide\n---\n{}", body),
        )
        .unwrap();

        let adapter = adapter_for(tmp.path(), 10);
        let first = adapter.scan().await.unwrap();
        assert_eq!(first.documents.len(), 3);
        let keys: Vec<(String, i64)> = first
            .documents
            .iter()
            .map(|d| (d.source_id.clone(), d.chunk_index))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("trainer-guide".to_string(), 0),
                ("trainer-guide".to_string(), 1),
                ("trainer-guide".to_string(), 2),
            ]
        );
        assert_eq!(first.documents[1].metadata["section"], "Setup");

        // Re-chunking an unchanged article yields the same keys
        let second = adapter.scan().await.unwrap();
        let second_keys: Vec<(String, i64)> = second
            .documents
            .iter()
            .map(|d| (d.source_id.clone(), d.chunk_index))
            .collect();
        assert_eq!(keys, second_keys);
    }

    #[tokio::test]
    async fn test_non_markdown_files_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), "not a blog post").unwrap();

        let report = adapter_for(tmp.path(), 6000).scan().await.unwrap();
        assert!(report.documents.is_empty());
        assert_eq!(report.malformed, 0);
    }

    #[test]
    fn test_parse_frontmatter_variants() {
        let (fm, body) = parse_frontmatter("---\ntitle: A\n---\nBody").unwrap();
        assert_eq!(fm.unwrap().title.as_deref(), Some("A"));
        assert_eq!(body, "Body");

        let (fm, body) = parse_frontmatter("No frontmatter here").unwrap();
        assert!(fm.is_none());
        assert_eq!(body, "No frontmatter here");

        assert!(parse_frontmatter("---\ntitle: A\nno closing").is_err());
    }
}
