use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{NewPostRecord, PostRecord};

/// Get a post record by its content id.
pub async fn find_by_content_id(pool: &SqlitePool, content_id: &str) -> Result<Option<PostRecord>> {
    sqlx::query_as("SELECT * FROM posted_content WHERE content_id = ?")
        .bind(content_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post record by content_id")
}

/// Insert a new post record, returning its ID.
///
/// Fails if a record with the same content id already exists.
pub async fn insert_post_record(pool: &SqlitePool, record: &NewPostRecord) -> Result<i64> {
    let posted_at = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r"
        INSERT INTO posted_content (content_id, posted_url, source_url, posted_at, status)
        VALUES (?, ?, ?, ?, 'posted')
        ",
    )
    .bind(&record.content_id)
    .bind(&record.posted_url)
    .bind(&record.source_url)
    .bind(&posted_at)
    .execute(pool)
    .await
    .context("Failed to insert post record")?;

    Ok(result.last_insert_rowid())
}

/// Count all recorded posts.
pub async fn count_posted(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posted_content")
        .fetch_one(pool)
        .await
        .context("Failed to count post records")?;

    Ok(row.0)
}

/// Get the most recently posted records, newest first.
pub async fn recent_posts(pool: &SqlitePool, limit: i64) -> Result<Vec<PostRecord>> {
    sqlx::query_as("SELECT * FROM posted_content ORDER BY posted_at DESC, id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to fetch recent post records")
}
