//! Database statistics overview.
//!
//! A quick summary of what's indexed: per-source document counts plus the
//! fact table, used by `kb stats` to confirm ingestion runs are landing.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::models::Source;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&pool)
        .await?;

    let total_facts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facts")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Knowledge Base — Stats");
    println!("======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", total_docs);
    println!("  Facts:       {}", total_facts);

    let source_rows = sqlx::query(
        r#"
        SELECT source, COUNT(*) AS doc_count, COUNT(DISTINCT source_id) AS item_count
        FROM documents
        GROUP BY source
        ORDER BY doc_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !source_rows.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<12} {:>6} {:>8}", "SOURCE", "ITEMS", "CHUNKS");
        println!("  {}", "-".repeat(30));

        for row in &source_rows {
            let source: String = row.get("source");
            let doc_count: i64 = row.get("doc_count");
            let item_count: i64 = row.get("item_count");
            // Flag rows with tags no current source produces
            let label = if Source::parse(&source).is_some() {
                source
            } else {
                format!("{} (?)", source)
            };
            println!("  {:<12} {:>6} {:>8}", label, item_count, doc_count);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
