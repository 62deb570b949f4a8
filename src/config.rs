use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::{RetrievalMode, Source};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between provider calls so batch runs stay under external
    /// rate limits.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            batch_delay_ms: 200,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_batch_delay_ms() -> u64 {
    200
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// Per-source cosine distance cutoffs for one retrieval mode.
///
/// A candidate whose distance exceeds its source's cutoff is discarded.
/// These are tunable policy, not a hard contract.
#[derive(Debug, Deserialize, Clone)]
pub struct Thresholds {
    pub fact: f64,
    pub blog: f64,
    pub forum_qa: f64,
    pub youtube: f64,
    pub forum_raw: f64,
}

impl Thresholds {
    pub fn precision_defaults() -> Self {
        Self {
            fact: 0.2,
            blog: 0.3,
            forum_qa: 0.4,
            youtube: 0.6,
            forum_raw: 0.6,
        }
    }

    pub fn expanded_defaults() -> Self {
        Self {
            fact: 0.3,
            blog: 0.75,
            forum_qa: 0.4,
            youtube: 0.8,
            forum_raw: 0.85,
        }
    }

    pub fn for_source(&self, source: Source) -> f64 {
        match source {
            Source::Fact => self.fact,
            Source::Blog => self.blog,
            Source::ForumQa => self.forum_qa,
            Source::Youtube => self.youtube,
            Source::ForumRaw => self.forum_raw,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Nearest-neighbor candidates fetched per source per query paraphrase.
    #[serde(default = "default_k_per_query")]
    pub k_per_query: usize,
    /// A new fact whose nearest stored fact is at or under this distance
    /// is treated as a duplicate of it.
    #[serde(default = "default_fact_dedup_distance")]
    pub fact_dedup_distance: f64,
    #[serde(default = "Thresholds::precision_defaults")]
    pub precision: Thresholds,
    #[serde(default = "Thresholds::expanded_defaults")]
    pub expanded: Thresholds,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_per_query: default_k_per_query(),
            fact_dedup_distance: default_fact_dedup_distance(),
            precision: Thresholds::precision_defaults(),
            expanded: Thresholds::expanded_defaults(),
        }
    }
}

impl RetrievalConfig {
    pub fn threshold(&self, source: Source, mode: RetrievalMode) -> f64 {
        match mode {
            RetrievalMode::Precision => self.precision.for_source(source),
            RetrievalMode::Expanded => self.expanded.for_source(source),
        }
    }
}

fn default_k_per_query() -> usize {
    8
}
fn default_fact_dedup_distance() -> f64 {
    0.10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Blog articles longer than this many characters are split on
    /// heading boundaries, one document per section.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    6000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    pub blog: Option<BlogSourceConfig>,
    pub youtube: Option<YoutubeSourceConfig>,
    pub forum: Option<ForumSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlogSourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_blog_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_blog_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct YoutubeSourceConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForumSourceConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_qa_table")]
    pub qa_table: String,
    #[serde(default = "default_topics_table")]
    pub topics_table: String,
}

fn default_qa_table() -> String {
    "qa_pairs".to_string()
}
fn default_topics_table() -> String {
    "topics".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
    }

    if config.retrieval.k_per_query == 0 {
        anyhow::bail!("retrieval.k_per_query must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.retrieval.fact_dedup_distance) {
        anyhow::bail!("retrieval.fact_dedup_distance must be in [0.0, 1.0]");
    }

    for (mode, thresholds) in [
        ("precision", &config.retrieval.precision),
        ("expanded", &config.retrieval.expanded),
    ] {
        for source in Source::ALL {
            let t = thresholds.for_source(source);
            if !(0.0..=2.0).contains(&t) {
                anyhow::bail!(
                    "retrieval.{}.{} must be a cosine distance in [0.0, 2.0], got {}",
                    mode,
                    source,
                    t
                );
            }
        }
    }

    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    // Table names are interpolated into SQL, so restrict them to
    // identifier characters.
    if let Some(forum) = &config.sources.forum {
        for table in [&forum.qa_table, &forum.topics_table] {
            if table.is_empty()
                || !table
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                anyhow::bail!("Invalid forum table name: '{}'", table);
            }
        }
    }

    Ok(())
}
