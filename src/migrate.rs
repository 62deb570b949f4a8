use anyhow::Result;
use sqlx::SqlitePool;

/// Create the knowledge-base schema. Idempotent — safe to run on every
/// `kb init`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One logical table for all embedded content. The natural key
    // (source, source_id, chunk_index) makes re-ingestion an upsert.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            title TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            PRIMARY KEY (source, source_id, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source)")
        .execute(pool)
        .await?;

    // Curated facts carry a stable integer id so the external review
    // spreadsheet can reference them across runs.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS facts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
