//! Engagement ranking for discovered content.

use crate::content::ContentItem;

/// Order candidates by weighted engagement score, best first.
///
/// The sort is stable, so items with equal scores keep their discovery
/// order and the output is reproducible for the same input batch.
#[must_use]
pub fn rank(mut items: Vec<ContentItem>) -> Vec<ContentItem> {
    items.sort_by_key(|item| std::cmp::Reverse(item.metrics.engagement_score()));
    items
}
