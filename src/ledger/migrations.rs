use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: creating posted_content table");

    // The UNIQUE constraint on content_id is what makes a concurrent
    // check-then-record race fail loudly instead of double-posting.
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS posted_content (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id TEXT NOT NULL UNIQUE,
            posted_url TEXT NOT NULL,
            source_url TEXT NOT NULL,
            posted_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'posted'
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create posted_content table")?;

    sqlx::query(
        r"
        CREATE INDEX IF NOT EXISTS idx_posted_content_posted_at
        ON posted_content(posted_at DESC)
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create posted_at index")?;

    Ok(())
}
