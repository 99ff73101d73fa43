//! Candidate discovery: tag fan-out, merge, rank, cap.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::content::ContentItem;
use crate::platform::ContentSource;
use crate::ranking::rank;

/// Discovers candidate content by fanning out queries across a rotating
/// sample of topic tags.
///
/// Per-tag failures are logged and skipped; only a run where every tag
/// fails produces an empty list, which callers treat as "no content this
/// run" rather than an error.
pub struct CandidateSource<'a, S: ContentSource> {
    source: &'a S,
    tags: &'a [String],
    sample_size: usize,
    per_tag_floor: usize,
    rng: StdRng,
}

impl<'a, S: ContentSource> CandidateSource<'a, S> {
    /// `seed` fixes the tag rotation for reproducible runs; entropy when
    /// unset.
    #[must_use]
    pub fn new(
        source: &'a S,
        tags: &'a [String],
        sample_size: usize,
        per_tag_floor: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            source,
            tags,
            sample_size,
            per_tag_floor,
            rng,
        }
    }

    /// Produce up to `target_count` candidates, ranked by engagement.
    pub async fn discover(&mut self, target_count: usize) -> Vec<ContentItem> {
        let sample_size = self.sample_size.min(self.tags.len());
        let sampled: Vec<&String> = self
            .tags
            .choose_multiple(&mut self.rng, sample_size)
            .collect();

        if sampled.is_empty() {
            warn!("No topic tags to query");
            return Vec::new();
        }

        let per_tag = self.per_tag_floor.max(target_count / sampled.len());
        debug!(
            tags = sampled.len(),
            per_tag, target_count, "Starting tag fan-out"
        );

        let mut merged: Vec<ContentItem> = Vec::new();
        // One clip can trend under several tags; keep the first sighting
        // so a single run never attempts the same id twice.
        let mut seen: HashSet<String> = HashSet::new();

        for tag in sampled {
            match self.source.query_by_tag(tag, per_tag).await {
                Ok(records) => {
                    let before = merged.len();
                    for record in &records {
                        if let Some(item) = ContentItem::from_record(record, tag) {
                            if seen.insert(item.content_id.clone()) {
                                merged.push(item);
                            }
                        }
                    }
                    debug!(
                        tag = %tag,
                        returned = records.len(),
                        kept = merged.len() - before,
                        "Tag query complete"
                    );
                }
                Err(e) => {
                    warn!(tag = %tag, "Tag query failed, continuing with remaining tags: {e:#}");
                    continue;
                }
            }

            if merged.len() >= target_count {
                debug!(collected = merged.len(), "Target reached, stopping fan-out early");
                break;
            }
        }

        let mut ranked = rank(merged);
        ranked.truncate(target_count);

        info!(candidates = ranked.len(), "Discovery complete");
        ranked
    }
}
