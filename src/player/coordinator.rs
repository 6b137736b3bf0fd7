use super::{MediaPlayer, PlaybackEvent};
use crate::project::{clip_at, edges_touch, source_time_of, timeline_time_of, Clip, ClipId, Timeline, VideoId};
use crossbeam_channel::Sender;
use tracing::{debug, trace};

/// Player drift below this is left alone on external seeks
pub const SEEK_TOLERANCE: f64 = 0.1;

/// Drives preview playback across clip boundaries.
///
/// The UI reports seeks and player ticks; the coordinator maps them between
/// timeline and source time, steers the player and emits [`PlaybackEvent`]s.
pub struct PlaybackCoordinator<P: MediaPlayer> {
    player: P,
    events: Sender<PlaybackEvent>,
    active_clip: Option<Clip>,
    position: f64,
    playing: bool,
    loading: bool,
    /// Video waiting for its duration before its initial clip is created
    pending_initial: Option<VideoId>,
}

impl<P: MediaPlayer> PlaybackCoordinator<P> {
    pub fn new(player: P, events: Sender<PlaybackEvent>) -> Self {
        Self {
            player,
            events,
            active_clip: None,
            position: 0.0,
            playing: false,
            loading: false,
            pending_initial: None,
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn active_clip(&self) -> Option<&Clip> {
        self.active_clip.as_ref()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    fn activate(&mut self, clip: &Clip) {
        if self.active_clip.as_ref().map(|c| &c.id) != Some(&clip.id) {
            debug!(clip = %clip.id, "Clip activated");
            self.emit(PlaybackEvent::ClipActivated(clip.id.clone()));
        }
        self.active_clip = Some(clip.clone());
    }

    /// The timeline moved under the player (scrub, click, keyboard).
    /// Returns false when no clip covers `timeline_pos`.
    pub fn on_external_seek(&mut self, timeline_pos: f64, clips: &[Clip]) -> bool {
        let Some(clip) = clip_at(timeline_pos, clips) else {
            return false;
        };
        let Some(expected) = source_time_of(timeline_pos, clip) else {
            return false;
        };

        if (self.player.current_source_time() - expected).abs() > SEEK_TOLERANCE {
            trace!(timeline_pos, source_time = expected, "Seeking player");
            self.player.seek(expected);
        }
        self.activate(clip);
        self.position = timeline_pos;
        true
    }

    /// The player reports a new source time while playing. Returns the
    /// timeline position it corresponds to, if any clip is active.
    pub fn on_player_time_advance(&mut self, source_time: f64, clips: &[Clip]) -> Option<f64> {
        let clip = self.current_clip(clips)?;

        if source_time >= clip.source_end {
            let end = clip.timeline_end();
            let next = clips
                .iter()
                .find(|c| c.id != clip.id && edges_touch(end, c.timeline_start) && c.same_source(&clip));

            return match next {
                Some(next) => {
                    self.player.seek(next.source_start);
                    self.activate(next);
                    self.report(next.timeline_start);
                    Some(next.timeline_start)
                }
                None => {
                    self.player.pause();
                    self.playing = false;
                    self.position = end;
                    debug!(at = end, "Reached end of contiguous clips, pausing");
                    self.emit(PlaybackEvent::Paused(end));
                    Some(end)
                }
            };
        }

        let pos = timeline_time_of(source_time, &clip).max(0.0);
        self.report(pos);
        Some(pos)
    }

    fn report(&mut self, pos: f64) {
        self.position = pos;
        self.emit(PlaybackEvent::Position(pos));
    }

    /// Refresh the active clip against the live list; edits may have
    /// replaced or removed it. Falls back to the clip at the current
    /// position, then to the clip at 0.
    fn current_clip(&mut self, clips: &[Clip]) -> Option<Clip> {
        let live = self
            .active_clip
            .as_ref()
            .and_then(|active| clips.iter().find(|c| c.id == active.id))
            .or_else(|| clip_at(self.position, clips))
            .or_else(|| clip_at(0.0, clips))?
            .clone();
        self.activate(&live);
        Some(live)
    }

    /// A video was picked for preview. Its initial clip is created once
    /// the duration is known.
    pub fn on_video_selected(&mut self, video_id: &VideoId) {
        self.pending_initial = Some(video_id.clone());
        self.active_clip = None;
        if self.playing {
            self.player.pause();
            self.playing = false;
        }
    }

    /// While loading, durations reported by the player never create clips
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// The player learned the source duration of the loaded video
    pub fn on_duration_known(&mut self, source_duration: f64, timeline: &mut Timeline) -> Option<ClipId> {
        if self.loading {
            return None;
        }
        let video_id = self.pending_initial.take()?;
        let video = timeline.video(&video_id)?;
        if timeline.has_clips_for(video) {
            return None;
        }
        timeline.create_initial_clip(&video_id, source_duration)
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.player.play();
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.player.pause();
            self.playing = false;
            self.emit(PlaybackEvent::Paused(self.position));
        }
    }

    pub fn toggle_play(&mut self) -> bool {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ImportedMedia;
    use crossbeam_channel::{unbounded, Receiver};
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct MockPlayer {
        time: f64,
        playing: bool,
        seeks: Vec<f64>,
    }

    impl MediaPlayer for MockPlayer {
        fn load(&mut self, _source: &Path) {
            self.time = 0.0;
        }

        fn current_source_time(&self) -> f64 {
            self.time
        }

        fn seek(&mut self, source_time: f64) {
            self.time = source_time;
            self.seeks.push(source_time);
        }

        fn play(&mut self) {
            self.playing = true;
        }

        fn pause(&mut self) {
            self.playing = false;
        }
    }

    fn clip(id: &str, video: &str, source: (f64, f64), at: f64) -> Clip {
        Clip {
            id: ClipId(id.to_string()),
            video_id: Some(VideoId(video.to_string())),
            source_path: PathBuf::from(format!("/media/{}.mp4", video)),
            source_start: source.0,
            source_end: source.1,
            timeline_start: at,
            duration: source.1 - source.0,
        }
    }

    fn coordinator() -> (PlaybackCoordinator<MockPlayer>, Receiver<PlaybackEvent>) {
        let (tx, rx) = unbounded();
        (PlaybackCoordinator::new(MockPlayer::default(), tx), rx)
    }

    #[test]
    fn test_external_seek_maps_to_source_time() {
        let (mut coord, rx) = coordinator();
        let clips = vec![clip("clip_1", "video_1", (0.0, 5.0), 0.0), clip("clip_2", "video_1", (20.0, 30.0), 5.0)];

        assert!(coord.on_external_seek(7.0, &clips));
        assert_eq!(coord.player().seeks, vec![22.0]);
        assert_eq!(coord.active_clip().unwrap().id.0, "clip_2");
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::ClipActivated(ClipId("clip_2".into())));

        assert!(!coord.on_external_seek(40.0, &clips));
    }

    #[test]
    fn test_small_drift_does_not_reseek() {
        let (mut coord, _rx) = coordinator();
        let clips = vec![clip("clip_1", "video_1", (0.0, 10.0), 0.0)];
        coord.player_mut().time = 3.05;

        coord.on_external_seek(3.0, &clips);
        assert!(coord.player().seeks.is_empty());

        coord.on_external_seek(3.5, &clips);
        assert_eq!(coord.player().seeks, vec![3.5]);
    }

    #[test]
    fn test_time_advance_reports_timeline_position() {
        let (mut coord, rx) = coordinator();
        let clips = vec![clip("clip_1", "video_1", (10.0, 20.0), 0.0)];

        assert_eq!(coord.on_player_time_advance(12.5, &clips), Some(2.5));
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                PlaybackEvent::ClipActivated(ClipId("clip_1".into())),
                PlaybackEvent::Position(2.5)
            ]
        );
    }

    #[test]
    fn test_auto_advance_to_contiguous_same_source() {
        let (mut coord, _rx) = coordinator();
        let clips = vec![clip("clip_1", "video_1", (0.0, 5.0), 0.0), clip("clip_2", "video_1", (8.0, 12.0), 5.0)];
        coord.play();
        coord.on_external_seek(1.0, &clips);

        assert_eq!(coord.on_player_time_advance(5.0, &clips), Some(5.0));
        assert_eq!(coord.player().current_source_time(), 8.0);
        assert_eq!(coord.active_clip().unwrap().id.0, "clip_2");
        assert!(coord.is_playing());
    }

    #[test]
    fn test_pause_when_next_clip_is_other_source() {
        let (mut coord, rx) = coordinator();
        let clips = vec![clip("clip_1", "video_1", (0.0, 5.0), 0.0), clip("clip_2", "video_2", (0.0, 5.0), 5.0)];
        coord.play();
        coord.on_external_seek(4.0, &clips);

        assert_eq!(coord.on_player_time_advance(5.1, &clips), Some(5.0));
        assert!(!coord.is_playing());
        assert!(!coord.player().playing);
        assert_eq!(rx.try_iter().last(), Some(PlaybackEvent::Paused(5.0)));
    }

    #[test]
    fn test_pause_at_end_of_timeline() {
        let (mut coord, _rx) = coordinator();
        let clips = vec![clip("clip_1", "video_1", (0.0, 5.0), 0.0)];
        coord.play();
        assert_eq!(coord.on_player_time_advance(6.0, &clips), Some(5.0));
        assert!(!coord.is_playing());
    }

    #[test]
    fn test_gap_stops_auto_advance() {
        let (mut coord, _rx) = coordinator();
        let clips = vec![clip("clip_1", "video_1", (0.0, 5.0), 0.0), clip("clip_2", "video_1", (5.0, 10.0), 6.0)];
        coord.play();
        coord.on_player_time_advance(1.0, &clips);
        coord.on_player_time_advance(5.0, &clips);
        assert!(!coord.is_playing());
    }

    #[test]
    fn test_no_clips_no_position() {
        let (mut coord, _rx) = coordinator();
        assert_eq!(coord.on_player_time_advance(1.0, &[]), None);
    }

    #[test]
    fn test_stale_active_clip_is_refreshed() {
        let (mut coord, _rx) = coordinator();
        let before = vec![clip("clip_1", "video_1", (0.0, 10.0), 0.0)];
        coord.on_external_seek(2.0, &before);

        // clip_1 split at 5 into clip_1 [0,5) and clip_2 [5,10)
        let after = vec![clip("clip_1", "video_1", (0.0, 5.0), 0.0), clip("clip_2", "video_1", (5.0, 10.0), 5.0)];
        coord.play();
        assert_eq!(coord.on_player_time_advance(5.0, &after), Some(5.0));
        assert_eq!(coord.active_clip().unwrap().id.0, "clip_2");
        assert!(coord.is_playing());
    }

    fn timeline_with_video() -> (Timeline, VideoId) {
        let mut timeline = Timeline::new();
        let ids = timeline.add_videos(vec![ImportedMedia {
            name: "a.mp4".to_string(),
            path: PathBuf::from("/media/a.mp4"),
            size: 1024,
        }]);
        (timeline, ids[0].clone())
    }

    #[test]
    fn test_duration_creates_initial_clip_once() {
        let (mut coord, _rx) = coordinator();
        let (mut timeline, video) = timeline_with_video();

        coord.on_video_selected(&video);
        let created = coord.on_duration_known(12.0, &mut timeline);
        assert!(created.is_some());
        assert_eq!(timeline.clips().len(), 1);
        assert_eq!(timeline.clips()[0].source_end, 12.0);

        // Duration reported again without a new selection
        assert!(coord.on_duration_known(12.0, &mut timeline).is_none());
        // Re-selecting the video for preview
        coord.on_video_selected(&video);
        assert!(coord.on_duration_known(12.0, &mut timeline).is_none());
        assert_eq!(timeline.clips().len(), 1);
    }

    #[test]
    fn test_loading_suppresses_initial_clip() {
        let (mut coord, _rx) = coordinator();
        let (mut timeline, video) = timeline_with_video();

        coord.set_loading(true);
        assert!(coord.is_loading());
        coord.on_video_selected(&video);
        assert!(coord.on_duration_known(12.0, &mut timeline).is_none());
        assert!(timeline.clips().is_empty());
    }

    #[test]
    fn test_toggle_play() {
        let (mut coord, rx) = coordinator();
        assert!(coord.toggle_play());
        assert!(coord.player().playing);
        assert!(!coord.toggle_play());
        assert_eq!(rx.try_iter().last(), Some(PlaybackEvent::Paused(0.0)));
    }
}
