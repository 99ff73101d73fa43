//! Filtering of already-posted content out of a candidate list.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::content::ContentItem;
use crate::ledger::PostHistory;

/// Drop candidates whose content id is already in the post history.
///
/// Preserves relative order and recomputes from scratch on every call;
/// nothing is cached between runs. Each membership check is a round trip
/// to the persistence capability.
///
/// Policy on a failed membership check: by default the whole stage fails
/// (fail closed) so an unreadable history can never cause a repost. With
/// `degraded` set, a failed check passes the item through as not-yet-
/// posted (fail open) with a warning.
///
/// # Errors
///
/// Returns the first membership-check error when not in degraded mode.
pub async fn filter_unposted(
    candidates: Vec<ContentItem>,
    history: &dyn PostHistory,
    degraded: bool,
) -> Result<Vec<ContentItem>> {
    let total = candidates.len();
    let mut fresh = Vec::with_capacity(total);

    for item in candidates {
        match history.exists(&item.content_id).await {
            Ok(true) => {
                debug!(content_id = %item.content_id, "Skipping already posted content");
            }
            Ok(false) => fresh.push(item),
            Err(e) if degraded => {
                warn!(
                    content_id = %item.content_id,
                    "Membership check failed in degraded mode, treating as not posted: {e:#}"
                );
                fresh.push(item);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Membership check failed for content {}; refusing to risk a repost",
                        item.content_id
                    )
                });
            }
        }
    }

    debug!(total, fresh = fresh.len(), "Dedup filter complete");
    Ok(fresh)
}
