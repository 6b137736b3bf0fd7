mod clock;
mod coordinator;

pub use clock::*;
pub use coordinator::*;

use crate::project::ClipId;
use std::path::Path;

/// The preview player, addressed in source time of the loaded file
pub trait MediaPlayer: Send {
    fn load(&mut self, source: &Path);
    fn current_source_time(&self) -> f64;
    fn seek(&mut self, source_time: f64);
    fn play(&mut self);
    fn pause(&mut self);
}

/// Notifications from the coordinator to whoever draws the timeline
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Current timeline position
    Position(f64),
    ClipActivated(ClipId),
    /// Playback stopped at this timeline position
    Paused(f64),
}
