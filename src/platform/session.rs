//! Credential acquisition and session caching.
//!
//! Credentials come from an environment override, a local JSON file, or
//! an interactive prompt (cached back to the file). The session token is
//! cached separately so repeated runs can skip re-authentication.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Platform account credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// How a login was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A cached session token was still accepted by the platform.
    Resumed,
    /// A fresh username/password login was performed.
    Fresh,
}

/// Cached session state from a previous successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub username: String,
    pub token: String,
}

/// Supplies credentials from env override, file, or interactive prompt.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Obtain credentials.
    ///
    /// Resolution order: `PLATFORM_USERNAME`/`PLATFORM_PASSWORD` env
    /// override, then the credentials file, then an interactive prompt
    /// whose answers are cached to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if no source yields a usable username/password
    /// pair (a setup failure; the run aborts before any attempt).
    pub async fn get(&self) -> Result<Credentials> {
        if let Some(creds) = env_credentials() {
            debug!(username = %creds.username, "Using credentials from environment");
            return Ok(creds);
        }

        match self.load().await {
            Ok(Some(creds)) => {
                debug!(username = %creds.username, "Loaded credentials from file");
                return Ok(creds);
            }
            Ok(None) => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to read credentials file: {e:#}"),
        }

        info!("No stored credentials, prompting");
        let creds = tokio::task::spawn_blocking(prompt_credentials)
            .await
            .context("Credential prompt task failed")??;

        if let Err(e) = self.save(&creds).await {
            warn!(path = %self.path.display(), "Failed to cache credentials: {e:#}");
        }

        Ok(creds)
    }

    async fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .context("Failed to read credentials file")?;
        let creds: Credentials =
            serde_json::from_str(&raw).context("Failed to parse credentials file")?;
        if creds.username.is_empty() || creds.password.is_empty() {
            return Ok(None);
        }
        Ok(Some(creds))
    }

    async fn save(&self, creds: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create credentials directory")?;
        }
        let raw = serde_json::to_string_pretty(creds)?;
        tokio::fs::write(&self.path, raw)
            .await
            .context("Failed to write credentials file")?;
        info!(username = %creds.username, path = %self.path.display(), "Cached credentials");
        Ok(())
    }
}

fn env_credentials() -> Option<Credentials> {
    let username = std::env::var("PLATFORM_USERNAME").ok().filter(|s| !s.is_empty())?;
    let password = std::env::var("PLATFORM_PASSWORD").ok().filter(|s| !s.is_empty())?;
    Some(Credentials { username, password })
}

fn prompt_credentials() -> Result<Credentials> {
    let username = prompt_line("Platform username: ")?;
    let password = prompt_line("Platform password: ")?;
    if username.is_empty() || password.is_empty() {
        anyhow::bail!("username and password are both required");
    }
    Ok(Credentials { username, password })
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{label}");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// File-backed cache of the last session token.
#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Load the cached session, if any. Unreadable or corrupt cache files
    /// are treated as absent.
    pub async fn load(&self) -> Option<SessionState> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %self.path.display(), "Discarding corrupt session cache: {e}");
                None
            }
        }
    }

    /// Persist the session for future runs.
    pub async fn store(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create session directory")?;
        }
        let raw = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, raw)
            .await
            .context("Failed to write session cache")?;
        debug!(path = %self.path.display(), "Session cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_session_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SessionCache::new(&temp_dir.path().join("session.json"));

        assert!(cache.load().await.is_none());

        let state = SessionState {
            username: "poster".to_string(),
            token: "tok-123".to_string(),
        };
        cache.store(&state).await.unwrap();

        let loaded = cache.load().await.expect("session persisted");
        assert_eq!(loaded.username, "poster");
        assert_eq!(loaded.token, "tok-123");
    }

    #[tokio::test]
    async fn test_corrupt_session_cache_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let cache = SessionCache::new(&path);
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn test_credentials_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(&temp_dir.path().join("credentials.json"));

        let creds = Credentials {
            username: "poster".to_string(),
            password: "hunter2".to_string(),
        };
        store.save(&creds).await.unwrap();

        let loaded = store.load().await.unwrap().expect("credentials persisted");
        assert_eq!(loaded.username, "poster");
        assert_eq!(loaded.password, "hunter2");
    }
}
