use serde::{Deserialize, Serialize};

/// A durable fact: this content id has been reposted.
///
/// Created exactly once when an upload succeeds; never mutated or
/// deleted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: i64,
    pub content_id: String,
    /// URL of the repost on the platform.
    pub posted_url: String,
    /// Canonical URL of the original content.
    pub source_url: String,
    /// RFC 3339 timestamp of the successful upload.
    pub posted_at: String,
    pub status: String,
}

/// Data for recording a new post.
#[derive(Debug, Clone)]
pub struct NewPostRecord {
    pub content_id: String,
    pub posted_url: String,
    pub source_url: String,
}
