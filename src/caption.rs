//! Caption generation for reposted clips.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const CAPTION_TEMPLATES: &[&str] = &[
    "This is peak content 🔥 #{tag}",
    "POV: your feed right now 😭 #{tag}",
    "No way this is real 💀 #{tag}",
    "The algorithm brought you here 👀 #{tag}",
    "Your daily dose of chaos 🧠 #{tag}",
    "This hits different 💯 #{tag}",
    "Bro what even is this 😭 #{tag}",
    "Certified classic already 🔥 #{tag}",
];

const HEADLINE_TAGS: &[&str] = &["viral", "fyp", "trending", "foryou", "funny"];

const HASHTAG_POOL: &[&str] = &[
    "#viral",
    "#fyp",
    "#foryou",
    "#trending",
    "#meme",
    "#funny",
    "#comedy",
    "#reels",
    "#explorepage",
    "#clips",
    "#entertainment",
    "#daily",
];

/// Generates post captions from a template pool and a hashtag pool.
///
/// Takes an explicit seed so test runs are reproducible; production runs
/// seed from entropy.
#[derive(Debug)]
pub struct CaptionGenerator {
    rng: StdRng,
}

impl CaptionGenerator {
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self { rng }
    }

    /// Produce a caption: one template with a headline tag, followed by
    /// 5-10 extra hashtags.
    pub fn generate(&mut self) -> String {
        let template = CAPTION_TEMPLATES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(CAPTION_TEMPLATES[0]);
        let headline = HEADLINE_TAGS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(HEADLINE_TAGS[0]);
        let caption = template.replace("{tag}", headline);

        let extra_count = self.rng.gen_range(5..=10);
        let hashtags: Vec<&str> = HASHTAG_POOL
            .choose_multiple(&mut self.rng, extra_count)
            .copied()
            .collect();

        format!("{caption}\n\n{}", hashtags.join(" "))
    }
}
