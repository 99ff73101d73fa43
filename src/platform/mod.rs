//! Capability surfaces of the remote content platform.
//!
//! The pipeline core only depends on the traits here; the HTTP client is
//! a thin wrapper with no wire-protocol cleverness.

mod http;
mod session;

pub use http::HttpPlatformClient;
pub use session::{CredentialStore, Credentials, LoginOutcome, SessionCache, SessionState};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::content::MediaRecord;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform signalled a rate limit (HTTP 429). Callers should
    /// back off longer than they would for a generic failure.
    #[error("rate limited by platform")]
    RateLimited,
    #[error("not authenticated; call login first")]
    NotAuthenticated,
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// A successfully published repost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    /// Platform id of the new post.
    pub id: String,
    /// Public URL of the new post.
    pub url: String,
}

/// Discovery capability: top media for a topic tag.
///
/// A failed call is non-fatal to discovery; the caller skips the tag.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn query_by_tag(&self, tag: &str, limit: usize)
        -> Result<Vec<MediaRecord>, PlatformError>;
}

/// Download capability: resolve an opaque media reference to a local file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, media_ref: &str) -> Result<PathBuf, PlatformError>;
}

/// Upload capability: publish a local media file with a caption.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, media_path: &Path, caption: &str)
        -> Result<PublishedPost, PlatformError>;
}
