use serde::{Deserialize, Serialize};
use std::fmt;

const VIDEO_PREFIX: &str = "video";
const CLIP_PREFIX: &str = "clip";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Issues `video_N` / `clip_N` identities for one project.
///
/// Counters only move forward. Seeding from loaded records keeps new
/// identities clear of everything already stored in the project.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last_video: u64,
    last_clip: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the counters past every numeric suffix in `existing`.
    /// Identities without a numeric suffix are ignored.
    pub fn seed<'a>(&mut self, existing: impl IntoIterator<Item = &'a str>) {
        for id in existing {
            if let Some(n) = numeric_suffix(id) {
                self.last_video = self.last_video.max(n);
                self.last_clip = self.last_clip.max(n);
            }
        }
    }

    pub fn next_video(&mut self) -> VideoId {
        self.last_video += 1;
        VideoId(format!("{}_{}", VIDEO_PREFIX, self.last_video))
    }

    pub fn next_clip(&mut self) -> ClipId {
        self.last_clip += 1;
        ClipId(format!("{}_{}", CLIP_PREFIX, self.last_clip))
    }
}

/// Trailing run of ASCII digits, e.g. `clip_12` -> 12
fn numeric_suffix(id: &str) -> Option<u64> {
    let digits = id.bytes().rev().take_while(u8::is_ascii_digit).count();
    id[id.len() - digits..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_suffix() {
        assert_eq!(numeric_suffix("clip_12"), Some(12));
        assert_eq!(numeric_suffix("video-3"), Some(3));
        assert_eq!(numeric_suffix("42"), Some(42));
        assert_eq!(numeric_suffix("clip_"), None);
        assert_eq!(numeric_suffix("intro"), None);
    }

    #[test]
    fn test_numeric_suffix_after_multibyte_char() {
        assert_eq!(numeric_suffix("clipé"), None);
        assert_eq!(numeric_suffix("video_é"), None);
        assert_eq!(numeric_suffix("prise_é7"), Some(7));
        assert_eq!(numeric_suffix("é"), None);

        let mut ids = IdAllocator::new();
        ids.seed(["clipé", "vidéo_3"]);
        assert_eq!(ids.next_clip(), ClipId::from("clip_4"));
    }

    #[test]
    fn test_seeded_ids_do_not_collide() {
        let mut ids = IdAllocator::new();
        ids.seed(["clip_4", "video_2", "clip_9", "legacy"]);
        assert_eq!(ids.next_clip(), ClipId::from("clip_10"));
        assert_eq!(ids.next_video(), VideoId::from("video_10"));
        assert_eq!(ids.next_clip(), ClipId::from("clip_11"));
    }

    #[test]
    fn test_fresh_allocator_starts_at_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_video(), VideoId::from("video_1"));
        assert_eq!(ids.next_clip(), ClipId::from("clip_1"));
    }
}
