//! Durable record of posted content, used for deduplication.

mod migrations;
mod models;
mod queries;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

/// Membership and append capability over the post history.
///
/// `exists` and `record` are each atomic, but the check-then-record pair
/// across an attempt is not; two concurrent runs can race on it. The
/// UNIQUE constraint in the SQLite backend turns that race into a loud
/// `record` failure rather than a duplicate row.
#[async_trait]
pub trait PostHistory: Send + Sync {
    async fn exists(&self, content_id: &str) -> Result<bool>;
    async fn record(&self, record: &NewPostRecord) -> Result<()>;
    async fn count(&self) -> Result<i64>;
}

/// SQLite-backed post ledger.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open the ledger, running migrations if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, migrations fail, or the
    /// database file is not writable.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Without a busy timeout, a concurrent run holding the write
            // lock produces immediate SQLITE_BUSY errors.
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite ledger")?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        ledger.verify_writable(path).await?;

        Ok(ledger)
    }

    async fn verify_writable(&self, path: &Path) -> Result<()> {
        // Detect deployment misconfigurations (e.g. a root-owned volume)
        // before the run starts, not at the first record() after an upload.
        // Starting a transaction requires write capability on SQLite.
        let tx = self.pool.begin().await.with_context(|| {
            format!(
                "SQLite ledger is not writable (path: {}). Check volume mount permissions/ownership",
                path.display()
            )
        })?;

        tx.commit()
            .await
            .context("Failed to commit SQLite writability check")?;
        Ok(())
    }

    async fn run_migrations(&self) -> Result<()> {
        migrations::run(&self.pool).await?;
        info!("Ledger migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The most recently posted records, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<PostRecord>> {
        recent_posts(&self.pool, limit).await
    }

    /// Close the connection pool. Owned by the orchestrator's cleanup path.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Ledger connection closed");
    }
}

#[async_trait]
impl PostHistory for SqliteLedger {
    async fn exists(&self, content_id: &str) -> Result<bool> {
        Ok(find_by_content_id(&self.pool, content_id).await?.is_some())
    }

    async fn record(&self, record: &NewPostRecord) -> Result<()> {
        insert_post_record(&self.pool, record).await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        count_posted(&self.pool).await
    }
}
