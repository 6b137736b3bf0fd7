use super::ids::{ClipId, IdAllocator, VideoId};
use super::mapping::{self, EDGE_EPSILON};
use super::media::{file_name, ImportedMedia, Video};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Splits closer than this to either clip edge are rejected
pub const MIN_SPLIT_MARGIN: f64 = 0.001;

/// A `[source_start, source_end)` range of one video placed at `timeline_start`.
///
/// Playback is always 1:1, so `duration == source_end - source_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,
    /// Path of the source as it was when the clip was made
    pub source_path: PathBuf,
    pub source_start: f64,
    pub source_end: f64,
    pub timeline_start: f64,
    pub duration: f64,
}

impl Clip {
    pub fn timeline_end(&self) -> f64 {
        self.timeline_start + self.duration
    }

    pub fn contains(&self, timeline_pos: f64) -> bool {
        timeline_pos >= self.timeline_start && timeline_pos < self.timeline_end()
    }

    /// Whether this clip was cut from `video`. Clips that never got a
    /// `video_id` are matched on their stored source path.
    pub fn belongs_to(&self, video: &Video) -> bool {
        match &self.video_id {
            Some(id) => *id == video.id,
            None => self.source_path == video.path,
        }
    }

    pub fn same_source(&self, other: &Clip) -> bool {
        match (&self.video_id, &other.video_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.source_path == other.source_path,
        }
    }
}

/// The persisted aggregate: every imported video and every clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub videos: Vec<Video>,
    pub clips: Vec<Clip>,
}

/// A clip frozen for export together with the file it reads from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClip {
    pub clip: Clip,
    pub source_path: PathBuf,
}

/// Problems found by [`Timeline::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum ClipIssue {
    InvalidBounds(ClipId),
    DurationMismatch(ClipId),
    Overlap(ClipId, ClipId),
    Orphaned(ClipId),
}

impl fmt::Display for ClipIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBounds(id) => write!(f, "{} has an empty or negative source range", id),
            Self::DurationMismatch(id) => write!(f, "{} duration differs from its source range", id),
            Self::Overlap(a, b) => write!(f, "{} overlaps {}", a, b),
            Self::Orphaned(id) => write!(f, "{} references no known video", id),
        }
    }
}

/// The edit model. Owns the in-memory project and every edit operation.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    videos: Vec<Video>,
    clips: Vec<Clip>,
    selected_clip: Option<ClipId>,
    selected_video: Option<VideoId>,
    ids: IdAllocator,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a migrated project. `ids` must already be seeded from it.
    pub fn from_project(project: Project, ids: IdAllocator) -> Self {
        let selected_video = project.videos.first().map(|v| v.id.clone());
        let timeline = Self {
            videos: project.videos,
            clips: project.clips,
            selected_clip: None,
            selected_video,
            ids,
        };
        timeline.validate();
        timeline
    }

    pub fn snapshot(&self) -> Project {
        Project {
            videos: self.videos.clone(),
            clips: self.clips.clone(),
        }
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn video(&self, id: &VideoId) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == *id)
    }

    /// Clips in storage order. Use [`Timeline::ordered_clips`] for playback order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, id: &ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == *id)
    }

    pub fn ordered_clips(&self) -> Vec<&Clip> {
        let mut ordered: Vec<&Clip> = self.clips.iter().collect();
        ordered.sort_by(|a, b| a.timeline_start.total_cmp(&b.timeline_start));
        ordered
    }

    pub fn total_duration(&self) -> f64 {
        mapping::total_duration(&self.clips)
    }

    pub fn selected_clip(&self) -> Option<&Clip> {
        self.selected_clip.as_ref().and_then(|id| self.clip(id))
    }

    pub fn selected_video(&self) -> Option<&Video> {
        self.selected_video.as_ref().and_then(|id| self.video(id))
    }

    pub fn has_clips_for(&self, video: &Video) -> bool {
        self.clips.iter().any(|c| c.belongs_to(video))
    }

    /// Register imported files. Selects the first new video if nothing is selected.
    pub fn add_videos(&mut self, imported: Vec<ImportedMedia>) -> Vec<VideoId> {
        let mut added = Vec::with_capacity(imported.len());
        for media in imported {
            let id = self.ids.next_video();
            debug!(video = %id, path = %media.path.display(), "Video added");
            self.videos.push(Video {
                id: id.clone(),
                name: if media.name.is_empty() { file_name(&media.path) } else { media.name },
                path: media.path,
                size: media.size,
            });
            added.push(id);
        }

        if self.selected_video.is_none() {
            self.selected_video = added.first().cloned();
        }
        added
    }

    pub fn select_video(&mut self, id: &VideoId) -> bool {
        if self.video(id).is_none() {
            return false;
        }
        self.selected_video = Some(id.clone());
        true
    }

    pub fn select_clip(&mut self, id: &ClipId) -> bool {
        if self.clip(id).is_none() {
            return false;
        }
        self.selected_clip = Some(id.clone());
        true
    }

    /// Append a clip covering the whole source at the end of the timeline.
    ///
    /// Does nothing if the video is unknown, already has a clip, or the
    /// duration is unusable. Re-selecting a video for preview therefore
    /// never duplicates its clip.
    pub fn create_initial_clip(&mut self, video_id: &VideoId, source_duration: f64) -> Option<ClipId> {
        let video = self.video(video_id)?;
        if !source_duration.is_finite() || source_duration <= 0.0 {
            warn!(video = %video_id, source_duration, "Ignoring unusable source duration");
            return None;
        }
        if self.has_clips_for(video) {
            return None;
        }
        let source_path = video.path.clone();

        let clip = Clip {
            id: self.ids.next_clip(),
            video_id: Some(video_id.clone()),
            source_path,
            source_start: 0.0,
            source_end: source_duration,
            timeline_start: self.total_duration(),
            duration: source_duration,
        };
        debug!(clip = %clip.id, video = %video_id, at = clip.timeline_start, "Initial clip created");

        let id = clip.id.clone();
        self.clips.push(clip);
        self.selected_clip = Some(id.clone());
        Some(id)
    }

    /// Cut the clip under `timeline_pos` in two, selecting the right half.
    ///
    /// Returns `None` when no clip is under the position or the cut would
    /// land within [`MIN_SPLIT_MARGIN`] of a clip edge.
    pub fn split_at(&mut self, timeline_pos: f64) -> Option<(ClipId, ClipId)> {
        let index = self.clips.iter().position(|c| c.contains(timeline_pos))?;
        let clip = self.clips[index].clone();

        let relative = timeline_pos - clip.timeline_start;
        if relative < MIN_SPLIT_MARGIN || clip.duration - relative < MIN_SPLIT_MARGIN {
            debug!(clip = %clip.id, timeline_pos, "Split at clip edge ignored");
            return None;
        }

        let source_cut = clip.source_start + relative;
        let left = Clip {
            id: self.ids.next_clip(),
            video_id: clip.video_id.clone(),
            source_path: clip.source_path.clone(),
            source_start: clip.source_start,
            source_end: source_cut,
            timeline_start: clip.timeline_start,
            duration: source_cut - clip.source_start,
        };
        let right = Clip {
            id: self.ids.next_clip(),
            video_id: clip.video_id.clone(),
            source_path: clip.source_path.clone(),
            source_start: source_cut,
            source_end: clip.source_end,
            timeline_start: clip.timeline_start + left.duration,
            duration: clip.source_end - source_cut,
        };
        debug!(clip = %clip.id, left = %left.id, right = %right.id, source_cut, "Clip split");

        let ids = (left.id.clone(), right.id.clone());
        self.clips.splice(index..=index, [left, right]);
        self.selected_clip = Some(ids.1.clone());
        Some(ids)
    }

    /// Ripple delete: remove the clip and pull every later clip left by its
    /// duration. Selection moves to the next clip, else the previous one.
    pub fn delete_clip(&mut self, id: &ClipId) -> Option<Clip> {
        let ordered: Vec<ClipId> = self.ordered_clips().into_iter().map(|c| c.id.clone()).collect();
        let order_pos = ordered.iter().position(|c| c == id)?;
        let index = self.clips.iter().position(|c| c.id == *id)?;

        let removed = self.clips.remove(index);
        let gap_end = removed.timeline_end();
        for clip in &mut self.clips {
            if clip.timeline_start >= gap_end - EDGE_EPSILON {
                clip.timeline_start -= removed.duration;
            }
        }

        self.selected_clip = ordered
            .get(order_pos + 1)
            .or_else(|| order_pos.checked_sub(1).and_then(|p| ordered.get(p)))
            .cloned();

        debug!(clip = %removed.id, duration = removed.duration, "Clip ripple-deleted");
        Some(removed)
    }

    pub fn delete_selected_clip(&mut self) -> Option<Clip> {
        let id = self.selected_clip.clone()?;
        self.delete_clip(&id)
    }

    /// Repack every clip back to back in timeline order, closing all gaps
    /// and overlaps. Applying it twice changes nothing.
    pub fn glue_clips(&mut self) {
        self.repack();
        debug!(clips = self.clips.len(), "Clips glued");
    }

    /// Drop a video and every clip cut from it, then close the gaps.
    pub fn remove_video(&mut self, id: &VideoId) -> Option<Video> {
        let index = self.videos.iter().position(|v| v.id == *id)?;
        let video = self.videos.remove(index);

        let before = self.clips.len();
        self.clips.retain(|c| !c.belongs_to(&video));
        let removed_clips = before - self.clips.len();

        if self.selected_clip().is_none() {
            self.selected_clip = None;
        }
        if self.selected_video.as_ref() == Some(id) {
            self.selected_video = self
                .videos
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|i| self.videos.get(i)))
                .map(|v| v.id.clone());
        }

        self.repack();
        debug!(video = %video.id, removed_clips, "Video removed");
        Some(video)
    }

    /// Remove every video and clip
    pub fn clear_all(&mut self) {
        self.videos.clear();
        self.clips.clear();
        self.selected_clip = None;
        self.selected_video = None;
    }

    /// Select the clip before the current one; returns where it starts
    pub fn select_previous_clip(&mut self) -> Option<f64> {
        let ordered = self.ordered_clips();
        let current = self.selected_clip.as_ref()?;
        let pos = ordered.iter().position(|c| c.id == *current)?;
        let target = ordered.get(pos.checked_sub(1)?)?;
        let (id, start) = (target.id.clone(), target.timeline_start);
        self.selected_clip = Some(id);
        Some(start)
    }

    /// Select the clip after the current one (the first one when nothing
    /// is selected); returns where it starts
    pub fn select_next_clip(&mut self) -> Option<f64> {
        let ordered = self.ordered_clips();
        let next_pos = match &self.selected_clip {
            Some(current) => ordered.iter().position(|c| c.id == *current)? + 1,
            None => 0,
        };
        let target = ordered.get(next_pos)?;
        let (id, start) = (target.id.clone(), target.timeline_start);
        self.selected_clip = Some(id);
        Some(start)
    }

    /// Timeline-ordered copy of the clips with their source files resolved.
    /// Orphaned clips fall back to their stored path.
    pub fn export_snapshot(&self) -> Vec<ResolvedClip> {
        self.ordered_clips()
            .into_iter()
            .map(|clip| {
                let source_path = clip
                    .video_id
                    .as_ref()
                    .and_then(|id| self.video(id))
                    .map(|v| v.path.clone())
                    .unwrap_or_else(|| clip.source_path.clone());
                ResolvedClip {
                    clip: clip.clone(),
                    source_path,
                }
            })
            .collect()
    }

    /// Report invariant violations. Nothing is repaired or rejected here.
    pub fn validate(&self) -> Vec<ClipIssue> {
        let mut issues = Vec::new();

        for clip in &self.clips {
            if clip.source_start < 0.0 || clip.source_end <= clip.source_start {
                issues.push(ClipIssue::InvalidBounds(clip.id.clone()));
            } else if (clip.duration - (clip.source_end - clip.source_start)).abs() > EDGE_EPSILON {
                issues.push(ClipIssue::DurationMismatch(clip.id.clone()));
            }

            let known = match &clip.video_id {
                Some(id) => self.video(id).is_some(),
                None => false,
            };
            if !known {
                issues.push(ClipIssue::Orphaned(clip.id.clone()));
            }
        }

        let ordered = self.ordered_clips();
        for pair in ordered.windows(2) {
            if pair[1].timeline_start < pair[0].timeline_end() - EDGE_EPSILON {
                issues.push(ClipIssue::Overlap(pair[0].id.clone(), pair[1].id.clone()));
            }
        }

        for issue in &issues {
            warn!("Timeline inconsistency: {}", issue);
        }
        issues
    }

    fn repack(&mut self) {
        self.clips
            .sort_by(|a, b| a.timeline_start.total_cmp(&b.timeline_start));
        let mut cursor = 0.0;
        for clip in &mut self.clips {
            clip.timeline_start = cursor;
            cursor += clip.duration;
        }
    }
}
