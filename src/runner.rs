//! The run-level posting state machine.
//!
//! Consumes a ranked, deduped candidate list and attempts download+upload
//! for each until the success quota is met, the attempt ceiling is hit,
//! the supply runs out, or cancellation is requested. Failures are always
//! recoverable at run level; the loop never aborts on a bad item.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::caption::CaptionGenerator;
use crate::config::Config;
use crate::content::ContentItem;
use crate::ledger::{NewPostRecord, PostHistory};
use crate::platform::{MediaFetcher, PlatformError, PublishedPost, Publisher};

/// Bounded retry for ledger writes after a successful upload.
const RECORD_ATTEMPTS: u32 = 3;
const RECORD_BACKOFF_START: Duration = Duration::from_secs(1);

/// Why the attempt loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The success quota was reached.
    Succeeded,
    /// The candidate supply ran out first.
    Exhausted,
    /// The attempt ceiling was hit first.
    Capped,
    /// Cancellation was requested between iterations.
    Interrupted,
}

impl RunOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Exhausted => "exhausted",
            Self::Capped => "capped",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Result of one execution of the attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub successes: u32,
    pub attempts: u32,
    pub outcome: RunOutcome,
}

/// Fixed policy knobs for one run.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Successful posts to reach before stopping early.
    pub success_quota: u32,
    /// Hard cap on attempts regardless of success count.
    pub attempt_ceiling: u32,
    /// Pause between a successful download and the upload.
    pub courtesy_delay: Duration,
    /// Pause after a failed attempt.
    pub failure_penalty: Duration,
    /// Pause between successful posts, to spread them over time.
    pub pacing_delay: Duration,
    /// Pause after the platform signals a rate limit.
    pub rate_limit_backoff: Duration,
}

impl RunPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            success_quota: config.success_quota,
            attempt_ceiling: config.attempt_ceiling,
            courtesy_delay: config.courtesy_delay,
            failure_penalty: config.failure_penalty,
            pacing_delay: config.pacing_delay,
            rate_limit_backoff: config.rate_limit_backoff,
        }
    }
}

/// One execution of the posting loop over a candidate list.
pub struct PostingRun<'a, F, P, H> {
    fetcher: &'a F,
    publisher: &'a P,
    history: &'a H,
    policy: RunPolicy,
    captions: CaptionGenerator,
    cancel: CancellationToken,
}

impl<'a, F, P, H> PostingRun<'a, F, P, H>
where
    F: MediaFetcher,
    P: Publisher,
    H: PostHistory,
{
    #[must_use]
    pub fn new(
        fetcher: &'a F,
        publisher: &'a P,
        history: &'a H,
        policy: RunPolicy,
        captions: CaptionGenerator,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            publisher,
            history,
            policy,
            captions,
            cancel,
        }
    }

    /// Run the loop to a terminal state and report what happened.
    ///
    /// Always terminates: bounded by the attempt ceiling and the candidate
    /// supply. A run that ends below the success quota is a soft failure;
    /// the caller decides whether to alert.
    pub async fn run(&mut self, candidates: Vec<ContentItem>) -> RunSummary {
        let mut successes = 0u32;
        let mut attempts = 0u32;
        let mut supply = candidates.into_iter();

        let outcome = loop {
            if successes >= self.policy.success_quota {
                break RunOutcome::Succeeded;
            }
            if attempts >= self.policy.attempt_ceiling {
                warn!(
                    attempts,
                    ceiling = self.policy.attempt_ceiling,
                    "Attempt ceiling reached, stopping"
                );
                break RunOutcome::Capped;
            }
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping between attempts");
                break RunOutcome::Interrupted;
            }
            let Some(item) = supply.next() else {
                break RunOutcome::Exhausted;
            };

            attempts += 1;
            debug!(
                content_id = %item.content_id,
                tag = %item.topic_tag,
                score = item.metrics.engagement_score(),
                attempt = attempts,
                "Attempting candidate"
            );

            match self.attempt(&item).await {
                Ok(posted) => {
                    successes += 1;
                    info!(
                        content_id = %item.content_id,
                        posted_url = %posted.url,
                        successes,
                        quota = self.policy.success_quota,
                        "Posted content"
                    );
                    if successes < self.policy.success_quota {
                        self.pause(self.policy.pacing_delay).await;
                    }
                }
                Err(e) => {
                    let delay = if e.is_rate_limited() {
                        warn!(
                            content_id = %item.content_id,
                            backoff_secs = self.policy.rate_limit_backoff.as_secs(),
                            "Rate limited, extended backoff before next attempt"
                        );
                        self.policy.rate_limit_backoff
                    } else {
                        warn!(content_id = %item.content_id, "Attempt failed, continuing: {e:#}");
                        self.policy.failure_penalty
                    };
                    self.pause(delay).await;
                }
            }
        };

        let summary = RunSummary {
            successes,
            attempts,
            outcome,
        };
        info!(
            successes = summary.successes,
            attempts = summary.attempts,
            outcome = summary.outcome.as_str(),
            "Run complete"
        );
        summary
    }

    /// Download, publish, and record one candidate.
    ///
    /// A ledger failure after the upload does not fail the attempt; the
    /// content is live on the platform either way.
    async fn attempt(&mut self, item: &ContentItem) -> Result<PublishedPost, PlatformError> {
        let media_path = self.fetcher.fetch(&item.media_ref).await?;

        // Courtesy pause between the download and the upload.
        tokio::time::sleep(self.policy.courtesy_delay).await;

        let caption = self.captions.generate();
        let posted = self.publisher.publish(&media_path, &caption).await?;

        self.record_with_retry(item, &posted).await;
        Ok(posted)
    }

    /// Persist the post record, retrying with doubling backoff.
    ///
    /// If every attempt fails the post is live but unrecorded, so a
    /// future run may repost it. That gap is surfaced loudly here.
    async fn record_with_retry(&self, item: &ContentItem, posted: &PublishedPost) {
        let record = NewPostRecord {
            content_id: item.content_id.clone(),
            posted_url: posted.url.clone(),
            source_url: item.source_url.clone(),
        };

        let mut backoff = RECORD_BACKOFF_START;
        for attempt in 1..=RECORD_ATTEMPTS {
            match self.history.record(&record).await {
                Ok(()) => {
                    debug!(content_id = %record.content_id, "Post recorded in ledger");
                    return;
                }
                Err(e) if attempt < RECORD_ATTEMPTS => {
                    warn!(
                        content_id = %record.content_id,
                        attempt,
                        "Ledger write failed, retrying: {e:#}"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    error!(
                        content_id = %record.content_id,
                        posted_url = %record.posted_url,
                        source_url = %record.source_url,
                        "Post is live but could not be recorded; a future run may repost it: {e:#}"
                    );
                }
            }
        }
    }

    /// Sleep between iterations, waking early on cancellation so the next
    /// halt check sees it promptly.
    async fn pause(&self, delay: Duration) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }
}
