//! Tests for environment-driven configuration loading.
//!
//! These mutate process environment variables, so they are serialized.

use reel_reposter::config::Config;
use serial_test::serial;

const VARS: &[&str] = &[
    "PLATFORM_API_URL",
    "TOPIC_TAGS",
    "DISCOVERY_TARGET",
    "TAG_SAMPLE_SIZE",
    "PER_TAG_FLOOR",
    "RNG_SEED",
    "DEDUP_DEGRADED",
    "SUCCESS_QUOTA",
    "ATTEMPT_CEILING",
    "COURTESY_DELAY_SECS",
    "FAILURE_PENALTY_SECS",
    "PACING_DELAY_SECS",
    "RATE_LIMIT_BACKOFF_SECS",
    "DATABASE_PATH",
    "DOWNLOAD_DIR",
    "DOWNLOAD_RETENTION",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_api_url_is_required() {
    clear_env();
    assert!(Config::from_env().is_err());
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    std::env::set_var("PLATFORM_API_URL", "https://api.platform.example");

    let config = Config::from_env().unwrap();
    config.validate().unwrap();

    assert_eq!(config.success_quota, 5);
    assert_eq!(config.attempt_ceiling, 20);
    assert_eq!(config.discovery_target, 50);
    assert_eq!(config.tag_sample_size, 10);
    assert_eq!(config.per_tag_floor, 5);
    assert!(!config.dedup_degraded);
    assert!(config.rng_seed.is_none());
    assert!(!config.topic_tags.is_empty());
    assert_eq!(config.pacing_delay.as_secs(), 30);
    assert_eq!(config.rate_limit_backoff.as_secs(), 120);
}

#[test]
#[serial]
fn test_overrides() {
    clear_env();
    std::env::set_var("PLATFORM_API_URL", "https://api.platform.example");
    std::env::set_var("TOPIC_TAGS", "viral, #Memes");
    std::env::set_var("SUCCESS_QUOTA", "3");
    std::env::set_var("ATTEMPT_CEILING", "9");
    std::env::set_var("RNG_SEED", "7");
    std::env::set_var("DEDUP_DEGRADED", "true");

    let config = Config::from_env().unwrap();
    config.validate().unwrap();

    assert_eq!(config.topic_tags, vec!["viral", "memes"]);
    assert_eq!(config.success_quota, 3);
    assert_eq!(config.attempt_ceiling, 9);
    assert_eq!(config.rng_seed, Some(7));
    assert!(config.dedup_degraded);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_integer_rejected() {
    clear_env();
    std::env::set_var("PLATFORM_API_URL", "https://api.platform.example");
    std::env::set_var("ATTEMPT_CEILING", "twenty");

    assert!(Config::from_env().is_err());

    clear_env();
}
