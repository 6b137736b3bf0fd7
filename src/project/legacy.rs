//! Load-time normalization of older project records.
//!
//! Earlier project files stored clips with an embedded `sourceVideo` object
//! instead of a `videoId`, and some records carried no identity at all.
//! Every record is parsed into either its current or its legacy shape and
//! converted once into the canonical [`Video`] / [`Clip`] types.

use super::ids::{ClipId, IdAllocator, VideoId};
use super::media::{file_name, Video};
use super::timeline::{Clip, Project};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VideoRecord {
    Current(Video),
    Legacy(LegacyVideo),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyVideo {
    #[serde(default)]
    pub id: Option<VideoId>,
    #[serde(default)]
    pub name: Option<String>,
    pub path: PathBuf,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClipRecord {
    Current(Clip),
    Legacy(LegacyClip),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyClip {
    #[serde(default)]
    pub id: Option<ClipId>,
    #[serde(default)]
    pub video_id: Option<VideoId>,
    #[serde(default)]
    pub source_video: Option<LegacySourceVideo>,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    pub source_start: f64,
    pub source_end: f64,
    #[serde(default)]
    pub timeline_start: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacySourceVideo {
    pub path: PathBuf,
}

impl VideoRecord {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Current(v) => Some(v.id.0.as_str()),
            Self::Legacy(v) => v.id.as_ref().map(|id| id.0.as_str()),
        }
    }
}

impl ClipRecord {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Current(c) => Some(c.id.0.as_str()),
            Self::Legacy(c) => c.id.as_ref().map(|id| id.0.as_str()),
        }
    }
}

/// Normalize stored records into a canonical project and an id allocator
/// seeded past every identity already present.
///
/// A clip whose source matches no video keeps a `None` video id; it is
/// reported but never dropped.
pub fn migrate(videos: Vec<VideoRecord>, clips: Vec<ClipRecord>) -> (Project, IdAllocator) {
    let mut ids = IdAllocator::new();
    ids.seed(
        videos
            .iter()
            .filter_map(VideoRecord::id)
            .chain(clips.iter().filter_map(ClipRecord::id)),
    );

    let videos: Vec<Video> = videos
        .into_iter()
        .map(|record| match record {
            VideoRecord::Current(video) => video,
            VideoRecord::Legacy(legacy) => {
                let id = legacy.id.unwrap_or_else(|| ids.next_video());
                debug!(video = %id, "Migrated legacy video record");
                Video {
                    id,
                    name: legacy.name.unwrap_or_else(|| file_name(&legacy.path)),
                    path: legacy.path,
                    size: legacy.size.unwrap_or(0),
                }
            }
        })
        .collect();

    let mut migrated: Vec<Clip> = Vec::with_capacity(clips.len());
    for record in clips {
        let mut clip = match record {
            ClipRecord::Current(clip) => clip,
            ClipRecord::Legacy(legacy) => {
                let source_path = legacy
                    .source_path
                    .or(legacy.source_video.map(|v| v.path))
                    .unwrap_or_default();
                let timeline_start = legacy
                    .timeline_start
                    .unwrap_or_else(|| super::mapping::total_duration(&migrated));
                Clip {
                    id: legacy.id.unwrap_or_else(|| ids.next_clip()),
                    video_id: legacy.video_id,
                    source_path,
                    source_start: legacy.source_start,
                    source_end: legacy.source_end,
                    timeline_start,
                    duration: legacy.source_end - legacy.source_start,
                }
            }
        };

        if clip.video_id.is_none() {
            clip.video_id = video_for_path(&videos, &clip.source_path);
            match &clip.video_id {
                Some(video) => debug!(clip = %clip.id, %video, "Backfilled clip video id"),
                None => warn!(
                    clip = %clip.id,
                    path = %clip.source_path.display(),
                    "Clip source matches no video, keeping it orphaned"
                ),
            }
        }
        migrated.push(clip);
    }

    let project = Project {
        videos,
        clips: migrated,
    };
    (project, ids)
}

fn video_for_path(videos: &[Video], path: &Path) -> Option<VideoId> {
    videos.iter().find(|v| v.path == path).map(|v| v.id.clone())
}
