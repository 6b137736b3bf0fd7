use super::MediaPlayer;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Wall-clock position that advances only while running
pub struct PlaybackClock {
    started_at: Option<Instant>,
    base: f64,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            started_at: None,
            base: 0.0,
        }
    }

    /// Start or resume
    pub fn resume(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        self.base = self.get_time();
        self.started_at = None;
    }

    /// Jump to `time` without changing running/paused
    pub fn set_time(&mut self, time: f64) {
        self.base = time;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn get_time(&self) -> f64 {
        match self.started_at {
            Some(start) => self.base + start.elapsed().as_secs_f64(),
            None => self.base,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.started_at.is_none()
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Headless player: no decoding, source time is just a running clock.
/// Lets the CLI trace preview playback through clip boundaries.
#[derive(Default)]
pub struct ClockPlayer {
    source: Option<PathBuf>,
    clock: PlaybackClock,
}

impl ClockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        !self.clock.is_paused()
    }
}

impl MediaPlayer for ClockPlayer {
    fn load(&mut self, source: &Path) {
        self.source = Some(source.to_path_buf());
        self.clock = PlaybackClock::new();
    }

    fn current_source_time(&self) -> f64 {
        self.clock.get_time()
    }

    fn seek(&mut self, source_time: f64) {
        self.clock.set_time(source_time.max(0.0));
    }

    fn play(&mut self) {
        self.clock.resume();
    }

    fn pause(&mut self) {
        self.clock.pause();
    }
}
