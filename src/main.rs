//! # Coach KB CLI (`kb`)
//!
//! The `kb` binary is the interface to the knowledge base. It provides
//! commands for database initialization, content ingestion, curated fact
//! management, retrieval, and quick stats.
//!
//! ## Usage
//!
//! ```bash
//! kb --config ./config/kb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb init` | Create the SQLite database and run schema migrations |
//! | `kb sources` | List configured sources and their health |
//! | `kb ingest <source>` | Embed and store content from a source |
//! | `kb fact add "<text>"` | Add a curated fact (deduplicated) |
//! | `kb retrieve "<query>"` | Priority-weighted similarity retrieval |
//! | `kb stats` | Show what's indexed |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use coach_kb::{config, db, ingest, migrate, retrieve, sources, stats};

/// Coach KB — a priority-tiered knowledge base for content generation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kb",
    about = "Coach KB — a priority-tiered retrieval-augmented knowledge base",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and facts
    /// tables. Idempotent — running it multiple times is safe.
    Init,

    /// List configured sources and their health.
    Sources,

    /// Ingest content from a source.
    ///
    /// Scans the source, embeds each document, deduplicates facts, and
    /// upserts everything keyed by (source, source_id, chunk_index).
    /// Per-item failures are counted and reported, never fatal.
    Ingest {
        /// Source to ingest: `all`, `fact`, `blog`, `youtube`,
        /// `forum_qa`, or `forum_raw`.
        source: String,

        /// Delete the source's existing rows first (full refresh).
        #[arg(long)]
        full: bool,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Retrieve ranked results for a query.
    ///
    /// Embeds the query (plus any extra paraphrases), searches each
    /// source with its mode threshold, and prints deduplicated results
    /// sorted by ascending cosine distance.
    Retrieve {
        /// The query string.
        query: String,

        /// Additional paraphrases of the same information need.
        #[arg(long = "query")]
        extra_queries: Vec<String>,

        /// Threshold policy: `precision` (default, strict) or
        /// `expanded` (relaxed, for filling gaps).
        #[arg(long, default_value = "precision")]
        mode: String,

        /// Candidates fetched per source per paraphrase.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Manage curated facts.
    Fact {
        #[command(subcommand)]
        action: FactAction,
    },

    /// Show database statistics.
    Stats,
}

/// Fact management subcommands.
#[derive(Subcommand)]
enum FactAction {
    /// Add a fact from free text.
    ///
    /// The text is embedded and checked against existing facts; a near
    /// duplicate returns the existing fact's id instead of inserting.
    Add {
        /// The fact text.
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Ingest {
            source,
            full,
            limit,
        } => {
            ingest::run_ingest(&cfg, &source, full, limit).await?;
        }
        Commands::Retrieve {
            query,
            extra_queries,
            mode,
            k,
        } => {
            retrieve::run_retrieve(&cfg, &query, &extra_queries, &mode, k).await?;
        }
        Commands::Fact { action } => match action {
            FactAction::Add { text } => {
                ingest::run_fact_add(&cfg, &text).await?;
            }
        },
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
