use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Topic tags queried when none are configured.
const DEFAULT_TOPIC_TAGS: &[&str] = &[
    "viral",
    "trending",
    "fyp",
    "foryou",
    "comedy",
    "memes",
    "funny",
    "entertainment",
    "sigma",
    "ohio",
    "griddy",
    "mewing",
    "skibidi",
    "brainrot",
];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Platform
    pub api_base_url: String,
    pub credentials_path: PathBuf,
    pub session_path: PathBuf,
    pub request_timeout: Duration,

    // Discovery
    pub topic_tags: Vec<String>,
    pub discovery_target: usize,
    pub tag_sample_size: usize,
    pub per_tag_floor: usize,
    /// Seed for tag sampling and caption selection; entropy when unset.
    pub rng_seed: Option<u64>,

    // Dedup
    pub dedup_degraded: bool,

    // Posting loop
    pub success_quota: u32,
    pub attempt_ceiling: u32,
    pub courtesy_delay: Duration,
    pub failure_penalty: Duration,
    pub pacing_delay: Duration,
    pub rate_limit_backoff: Duration,

    // Storage
    pub database_path: PathBuf,
    pub download_dir: PathBuf,
    pub download_retention: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Platform
            api_base_url: required_env("PLATFORM_API_URL")?,
            credentials_path: PathBuf::from(env_or_default(
                "CREDENTIALS_PATH",
                "./data/credentials.json",
            )),
            session_path: PathBuf::from(env_or_default("SESSION_PATH", "./data/session.json")),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),

            // Discovery
            topic_tags: parse_tags(&env_or_default("TOPIC_TAGS", "")),
            discovery_target: parse_env_usize("DISCOVERY_TARGET", 50)?,
            tag_sample_size: parse_env_usize("TAG_SAMPLE_SIZE", 10)?,
            per_tag_floor: parse_env_usize("PER_TAG_FLOOR", 5)?,
            rng_seed: optional_env("RNG_SEED")
                .map(|v| {
                    v.parse().map_err(|e| ConfigError::ParseInt {
                        name: "RNG_SEED".to_string(),
                        source: e,
                    })
                })
                .transpose()?,

            // Dedup
            dedup_degraded: parse_env_bool("DEDUP_DEGRADED", false)?,

            // Posting loop
            success_quota: parse_env_u32("SUCCESS_QUOTA", 5)?,
            attempt_ceiling: parse_env_u32("ATTEMPT_CEILING", 20)?,
            courtesy_delay: Duration::from_secs(parse_env_u64("COURTESY_DELAY_SECS", 2)?),
            failure_penalty: Duration::from_secs(parse_env_u64("FAILURE_PENALTY_SECS", 5)?),
            pacing_delay: Duration::from_secs(parse_env_u64("PACING_DELAY_SECS", 30)?),
            rate_limit_backoff: Duration::from_secs(parse_env_u64("RATE_LIMIT_BACKOFF_SECS", 120)?),

            // Storage
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/ledger.sqlite")),
            download_dir: PathBuf::from(env_or_default("DOWNLOAD_DIR", "./data/downloads")),
            download_retention: parse_env_usize("DOWNLOAD_RETENTION", 5)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "PLATFORM_API_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.topic_tags.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "TOPIC_TAGS".to_string(),
                message: "at least one topic tag is required".to_string(),
            });
        }
        if self.success_quota == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SUCCESS_QUOTA".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.attempt_ceiling <= self.success_quota {
            return Err(ConfigError::InvalidValue {
                name: "ATTEMPT_CEILING".to_string(),
                message: format!(
                    "must exceed SUCCESS_QUOTA ({}), got {}",
                    self.success_quota, self.attempt_ceiling
                ),
            });
        }
        if self.discovery_target == 0 {
            return Err(ConfigError::InvalidValue {
                name: "DISCOVERY_TARGET".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.tag_sample_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "TAG_SAMPLE_SIZE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// A configuration suitable for tests: short delays and a fixed seed.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:0".to_string(),
            credentials_path: PathBuf::from("./credentials.json"),
            session_path: PathBuf::from("./session.json"),
            request_timeout: Duration::from_secs(5),
            topic_tags: vec!["viral".to_string(), "memes".to_string()],
            discovery_target: 50,
            tag_sample_size: 10,
            per_tag_floor: 5,
            rng_seed: Some(42),
            dedup_degraded: false,
            success_quota: 5,
            attempt_ceiling: 20,
            courtesy_delay: Duration::from_millis(10),
            failure_penalty: Duration::from_millis(10),
            pacing_delay: Duration::from_millis(10),
            rate_limit_backoff: Duration::from_millis(50),
            database_path: PathBuf::from("./ledger.sqlite"),
            download_dir: PathBuf::from("./downloads"),
            download_retention: 5,
        }
    }
}

/// Split a comma-separated tag list, falling back to the built-in set.
fn parse_tags(raw: &str) -> Vec<String> {
    let tags: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_start_matches('#').to_lowercase())
        .collect();

    if tags.is_empty() {
        DEFAULT_TOPIC_TAGS.iter().map(ToString::to_string).collect()
    } else {
        tags
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
