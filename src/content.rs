use serde::{Deserialize, Serialize};

/// Engagement counters reported by the platform for a piece of media.
///
/// Counts default to zero when the platform omits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
}

impl Metrics {
    /// Weighted engagement score: comments weigh most, then likes, then views.
    #[must_use]
    pub fn engagement_score(&self) -> u64 {
        self.views
            .saturating_add(self.likes.saturating_mul(2))
            .saturating_add(self.comments.saturating_mul(3))
    }
}

/// Kind of media a discovery query returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Carousel,
    #[serde(other)]
    Other,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Carousel => "carousel",
            Self::Other => "other",
        }
    }
}

/// A raw media record as returned by a tag query.
///
/// This is the platform's shape, before the video filter and ranking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Platform-stable numeric primary key.
    pub pk: u64,
    /// URL slug for the media page.
    pub code: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
}

/// A discovered unit of media, ready for ranking and dedup.
///
/// Immutable after creation; lives for one pipeline pass and is only
/// persisted (as a [`crate::ledger::PostRecord`]) if it gets posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Dedup key: string form of the platform's numeric primary key.
    pub content_id: String,
    /// Canonical URL of the original content.
    pub source_url: String,
    /// The discovery query (hashtag) that surfaced this item.
    pub topic_tag: String,
    pub metrics: Metrics,
    /// Opaque reference the download capability uses to fetch bytes.
    pub media_ref: String,
}

impl ContentItem {
    /// Convert a raw media record into a candidate.
    ///
    /// Returns `None` for anything that is not postable video: images,
    /// carousels, and records missing a downloadable media reference.
    #[must_use]
    pub fn from_record(record: &MediaRecord, topic_tag: &str) -> Option<Self> {
        if record.kind != MediaKind::Video {
            return None;
        }
        let media_ref = record.video_url.clone().filter(|u| !u.is_empty())?;

        let source_url = record
            .permalink
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("/p/{}/", record.code));

        Some(Self {
            content_id: record.pk.to_string(),
            source_url,
            topic_tag: topic_tag.to_string(),
            metrics: Metrics {
                views: record.view_count,
                likes: record.like_count,
                comments: record.comment_count,
            },
            media_ref,
        })
    }
}
