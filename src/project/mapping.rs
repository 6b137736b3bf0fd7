//! Conversions between timeline time and source time.
//!
//! A clip plays its source range at 1:1 speed, so both directions are a
//! plain offset. Callers locate the owning clip with [`clip_at`] first.

use super::timeline::Clip;

/// Tolerance used when asking whether two clip edges touch
pub const EDGE_EPSILON: f64 = 1e-6;

/// Source position for `timeline_pos`, or `None` when the position falls
/// outside the clip's half-open timeline interval.
pub fn source_time_of(timeline_pos: f64, clip: &Clip) -> Option<f64> {
    clip.contains(timeline_pos)
        .then(|| clip.source_start + (timeline_pos - clip.timeline_start))
}

/// Timeline position for a source position inside `clip`
pub fn timeline_time_of(source_time: f64, clip: &Clip) -> f64 {
    clip.timeline_start + (source_time - clip.source_start)
}

/// The clip whose `[timeline_start, timeline_end)` contains `timeline_pos`
pub fn clip_at(timeline_pos: f64, clips: &[Clip]) -> Option<&Clip> {
    clips.iter().find(|c| c.contains(timeline_pos))
}

/// End of the last clip, or 0 for an empty timeline
pub fn total_duration(clips: &[Clip]) -> f64 {
    clips.iter().map(Clip::timeline_end).fold(0.0, f64::max)
}

pub fn edges_touch(end: f64, start: f64) -> bool {
    (end - start).abs() < EDGE_EPSILON
}
