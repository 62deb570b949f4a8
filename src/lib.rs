//! # Coach KB
//!
//! A priority-tiered, retrieval-augmented knowledge base for content
//! generation pipelines.
//!
//! Coach KB ingests heterogeneous content — blog articles, YouTube
//! transcripts, forum Q&A, raw forum discussion, and curated facts —
//! embeds it into a single SQLite-backed vector store, and serves
//! similarity-ranked, source-weighted retrieval for downstream article
//! drafting.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │   Adapters   │──▶│   Pipeline   │──▶│  SQLite   │
//! │ blog/yt/forum│   │ Embed+Dedup  │   │ docs+vecs │
//! │ facts        │   └──────────────┘   └─────┬─────┘
//! └──────────────┘                            │
//!                                             ▼
//!                                      ┌────────────┐
//!                                      │ Retrieval  │
//!                                      │  (tiered)  │
//!                                      └────────────┘
//! ```
//!
//! Each source carries a priority tier and per-mode cosine distance
//! thresholds: curated facts are strict and dominate results, raw forum
//! chatter only surfaces when it is a close match or the caller selects
//! expanded mode.
//!
//! ## Quick Start
//!
//! ```bash
//! kb init                          # create database
//! kb ingest blog                   # embed blog articles
//! kb fact add "ERG mode is supported."
//! kb retrieve "garmin sync" --mode precision
//! kb stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`adapter`] | Source adapter trait + priority/threshold policy |
//! | [`adapter_blog`] | Markdown blog articles |
//! | [`adapter_youtube`] | YouTube transcript JSON |
//! | [`adapter_forum`] | Forum Q&A and raw threads |
//! | [`adapter_fact`] | Curated fact table |
//! | [`chunk`] | Heading-boundary article splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | SQLite vector store |
//! | [`ingest`] | Ingestion pipeline |
//! | [`retrieve`] | Priority-weighted retrieval engine |

pub mod adapter;
pub mod adapter_blog;
pub mod adapter_fact;
pub mod adapter_forum;
pub mod adapter_youtube;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod retrieve;
pub mod sources;
pub mod stats;
pub mod store;
