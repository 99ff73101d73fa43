use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reel_reposter::caption::CaptionGenerator;
use reel_reposter::config::Config;
use reel_reposter::discovery::CandidateSource;
use reel_reposter::ledger::{PostHistory, SqliteLedger};
use reel_reposter::platform::{CredentialStore, HttpPlatformClient, LoginOutcome, SessionCache};
use reel_reposter::runner::{PostingRun, RunPolicy, RunSummary};
use reel_reposter::{dedup, downloads};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting reel-reposter");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        api = %config.api_base_url,
        tags = config.topic_tags.len(),
        quota = config.success_quota,
        ceiling = config.attempt_ceiling,
        "Configuration loaded"
    );

    // Ensure data directories exist
    downloads::ensure_dir(&config.download_dir).await?;
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    // Open the post ledger; unreachable persistence is a setup failure.
    let ledger = SqliteLedger::open(&config.database_path)
        .await
        .context("Failed to open post ledger")?;
    info!(posted = ledger.count().await?, "Post ledger opened");
    if let Some(last) = ledger.recent(1).await?.into_iter().next() {
        info!(
            content_id = %last.content_id,
            posted_at = %last.posted_at,
            "Most recent recorded post"
        );
    }

    // Stop the attempt loop between iterations on Ctrl-C/SIGTERM; cleanup
    // still runs afterwards.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_cancel.cancel();
    });

    let result = login_and_run(&config, &ledger, cancel).await;

    // Cleanup runs on every path once the ledger is open: success, error,
    // and interrupt alike.
    if let Err(e) = downloads::cleanup_old_files(&config.download_dir, config.download_retention).await
    {
        warn!("Download cleanup failed: {e:#}");
    }
    ledger.close().await;
    info!("Cleanup complete");

    result
}

async fn login_and_run(
    config: &Config,
    ledger: &SqliteLedger,
    cancel: CancellationToken,
) -> Result<()> {
    let credentials = CredentialStore::new(&config.credentials_path)
        .get()
        .await
        .context("Failed to obtain credentials")?;

    let mut client = HttpPlatformClient::new(config).context("Failed to build platform client")?;
    let session_cache = SessionCache::new(&config.session_path);
    match client
        .login(&credentials, &session_cache)
        .await
        .context("Failed to log in to platform")?
    {
        LoginOutcome::Resumed => info!(username = %credentials.username, "Resumed cached session"),
        LoginOutcome::Fresh => {
            info!(username = %credentials.username, "Logged in with fresh session");
        }
    }

    run_pipeline(config, &client, ledger, cancel).await
}

/// Discover, dedup, and post. A run that falls short of the quota is a
/// soft failure: logged, but the process still exits cleanly.
async fn run_pipeline(
    config: &Config,
    client: &HttpPlatformClient,
    ledger: &SqliteLedger,
    cancel: CancellationToken,
) -> Result<()> {
    let mut source = CandidateSource::new(
        client,
        &config.topic_tags,
        config.tag_sample_size,
        config.per_tag_floor,
        config.rng_seed,
    );
    let candidates = source.discover(config.discovery_target).await;

    let fresh = dedup::filter_unposted(candidates, ledger, config.dedup_degraded)
        .await
        .context("Dedup stage failed")?;
    info!(candidates = fresh.len(), "Candidates ready after dedup");

    let captions = CaptionGenerator::new(config.rng_seed);
    let mut run = PostingRun::new(
        client,
        client,
        ledger,
        RunPolicy::from_config(config),
        captions,
        cancel,
    );
    let summary = run.run(fresh).await;
    report(&summary, config.success_quota);

    Ok(())
}

fn report(summary: &RunSummary, quota: u32) {
    if summary.successes < quota {
        warn!(
            successes = summary.successes,
            attempts = summary.attempts,
            outcome = summary.outcome.as_str(),
            quota,
            "Run ended below success quota"
        );
    } else {
        info!(
            successes = summary.successes,
            attempts = summary.attempts,
            outcome = summary.outcome.as_str(),
            "Run reached success quota"
        );
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reel_reposter=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
