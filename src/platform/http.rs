//! Thin HTTP client for the content platform.
//!
//! Deliberately minimal: JSON tag queries, streaming media download, and
//! a multipart upload, all behind the capability traits the pipeline
//! consumes. No retry logic lives here; the attempt loop owns pacing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::session::{Credentials, LoginOutcome, SessionCache, SessionState};
use super::{ContentSource, MediaFetcher, PlatformError, PublishedPost, Publisher};
use crate::config::Config;
use crate::content::MediaRecord;

#[derive(Debug, Deserialize)]
struct TagFeed {
    #[serde(default)]
    items: Vec<MediaRecord>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

/// HTTP-backed implementation of the platform capabilities.
#[derive(Debug)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
    base_url: String,
    download_dir: PathBuf,
    token: Option<String>,
}

impl HttpPlatformClient {
    /// Build a client with a bounded per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("reel-reposter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            download_dir: config.download_dir.clone(),
            token: None,
        })
    }

    /// Authenticate, preferring a cached session over a fresh login.
    ///
    /// Returns which branch satisfied the login. A cached token the
    /// platform no longer accepts falls back to exactly one fresh
    /// username/password login; any other failure propagates.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the credentials or is
    /// unreachable (a setup failure for the run).
    pub async fn login(
        &mut self,
        creds: &Credentials,
        cache: &SessionCache,
    ) -> Result<LoginOutcome, PlatformError> {
        if let Some(state) = cache.load().await {
            if state.username == creds.username {
                if self.verify_session(&state.token).await? {
                    self.token = Some(state.token);
                    return Ok(LoginOutcome::Resumed);
                }
                debug!("Cached session no longer accepted, logging in fresh");
            } else {
                debug!(
                    cached = %state.username,
                    requested = %creds.username,
                    "Cached session is for a different account, ignoring"
                );
            }
        }

        let token = self.password_login(creds).await?;
        let state = SessionState {
            username: creds.username.clone(),
            token: token.clone(),
        };
        if let Err(e) = cache.store(&state).await {
            warn!("Failed to cache session: {e:#}");
        }
        self.token = Some(token);
        Ok(LoginOutcome::Fresh)
    }

    /// Check whether a cached token is still accepted.
    async fn verify_session(&self, token: &str) -> Result<bool, PlatformError> {
        let endpoint = self.endpoint("/api/v1/session");
        let response = self.http.get(&endpoint).bearer_auth(token).send().await?;

        match response.status().as_u16() {
            200 => Ok(true),
            401 | 403 => Ok(false),
            429 => Err(PlatformError::RateLimited),
            status => Err(PlatformError::Status { endpoint, status }),
        }
    }

    async fn password_login(&self, creds: &Credentials) -> Result<String, PlatformError> {
        let endpoint = self.endpoint("/api/v1/session");
        let response = self
            .http
            .post(&endpoint)
            .json(&serde_json::json!({
                "username": creds.username,
                "password": creds.password,
            }))
            .send()
            .await?;

        match response.status().as_u16() {
            200 | 201 => {
                let body: LoginResponse = response.json().await?;
                Ok(body.token)
            }
            401 | 403 => Err(PlatformError::LoginRejected(format!(
                "platform refused credentials for {}",
                creds.username
            ))),
            429 => Err(PlatformError::RateLimited),
            status => Err(PlatformError::Status { endpoint, status }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn auth_token(&self) -> Result<&str, PlatformError> {
        self.token.as_deref().ok_or(PlatformError::NotAuthenticated)
    }
}

#[async_trait]
impl ContentSource for HttpPlatformClient {
    async fn query_by_tag(
        &self,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<MediaRecord>, PlatformError> {
        let endpoint = self.endpoint(&format!("/api/v1/tags/{tag}/media"));
        let response = self
            .http
            .get(&endpoint)
            .query(&[("limit", limit)])
            .bearer_auth(self.auth_token()?)
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                let feed: TagFeed = response.json().await?;
                Ok(feed.items)
            }
            429 => Err(PlatformError::RateLimited),
            status => Err(PlatformError::Status { endpoint, status }),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpPlatformClient {
    async fn fetch(&self, media_ref: &str) -> Result<PathBuf, PlatformError> {
        let response = self.http.get(media_ref).send().await?;

        match response.status().as_u16() {
            200 => {}
            429 => return Err(PlatformError::RateLimited),
            status => {
                return Err(PlatformError::Status {
                    endpoint: media_ref.to_string(),
                    status,
                })
            }
        }

        let path = self.download_dir.join(file_name_for(media_ref));
        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        debug!(path = %path.display(), "Downloaded media");
        Ok(path)
    }
}

#[async_trait]
impl Publisher for HttpPlatformClient {
    async fn publish(
        &self,
        media_path: &Path,
        caption: &str,
    ) -> Result<PublishedPost, PlatformError> {
        let bytes = tokio::fs::read(media_path).await?;
        let file_name = media_path
            .file_name()
            .map_or_else(|| "clip.mp4".to_string(), |n| n.to_string_lossy().into_owned());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("video/mp4")?;
        let form = reqwest::multipart::Form::new()
            .part("video", part)
            .text("caption", caption.to_string());

        let endpoint = self.endpoint("/api/v1/media");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(self.auth_token()?)
            .multipart(form)
            .send()
            .await?;

        match response.status().as_u16() {
            200 | 201 => {
                let body: UploadResponse = response.json().await?;
                let url = body
                    .url
                    .unwrap_or_else(|| format!("{}/p/{}/", self.base_url, body.id));
                Ok(PublishedPost { id: body.id, url })
            }
            429 => Err(PlatformError::RateLimited),
            status => Err(PlatformError::Status { endpoint, status }),
        }
    }
}

/// Pick a local file name for a media URL: its last path segment, falling
/// back to a generic name when the URL has none.
fn file_name_for(media_ref: &str) -> String {
    url::Url::parse(media_ref)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(ToString::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "media.mp4".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_for() {
        assert_eq!(
            file_name_for("https://cdn.example/videos/abc123.mp4?sig=x"),
            "abc123.mp4"
        );
        assert_eq!(file_name_for("https://cdn.example/"), "media.mp4");
        assert_eq!(file_name_for("not a url"), "media.mp4");
    }
}
