use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::export_pipeline::{ExportOutcome, ExportPipeline};
use crate::ffmpeg::{ExportProgress, FFmpegWrapper, TranscodeEngine};
use crate::player::{MediaPlayer, PlaybackCoordinator, PlaybackEvent};
use crate::project::{
    clip_at, import_paths, AutoSaver, Clip, ClipId, ExportSettings, ProjectMeta, ProjectStore, QualityPreset,
    Timeline, Video, VideoId,
};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// One open project: the timeline, its persistence, the preview player and
/// the export engine. Every edit schedules an autosave.
///
/// Must be opened from within a tokio runtime.
pub struct Editor<P: MediaPlayer> {
    config: EditorConfig,
    store: Arc<ProjectStore>,
    timeline: Timeline,
    playback: PlaybackCoordinator<P>,
    autosaver: AutoSaver,
    ffmpeg: FFmpegWrapper,
    exporter: Arc<ExportPipeline>,
    /// Source file currently loaded in the player
    loaded_source: Option<PathBuf>,
    pub status_message: String,
}

impl<P: MediaPlayer> Editor<P> {
    pub fn open(
        root: impl Into<PathBuf>,
        config: EditorConfig,
        player: P,
        events: Sender<PlaybackEvent>,
        engine: Arc<dyn TranscodeEngine>,
    ) -> Result<Self> {
        let (store, timeline) = ProjectStore::load_or_create(root)?;
        let store = Arc::new(store);
        let autosaver = AutoSaver::spawn(Arc::clone(&store), config.autosave_delay());

        // The restored video goes back into the player, but the duration it
        // reports must not create clips until the user picks a video.
        let mut playback = PlaybackCoordinator::new(player, events);
        playback.set_loading(true);
        let restored = timeline.selected_video().map(|v| store.resolve(&v.path));
        if let Some(path) = &restored {
            playback.player_mut().load(path);
        }

        let exporter = Arc::new(ExportPipeline::new(engine, config.temp_dir.clone()));
        let status_message = format!("Opened {}", store.meta().name);

        Ok(Self {
            ffmpeg: FFmpegWrapper::from_config(&config),
            config,
            store,
            timeline,
            playback,
            autosaver,
            exporter,
            loaded_source: restored,
            status_message,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn meta(&self) -> ProjectMeta {
        self.store.meta()
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn playback(&self) -> &PlaybackCoordinator<P> {
        &self.playback
    }

    /// Shared handle so another task can cancel a running export
    pub fn exporter(&self) -> Arc<ExportPipeline> {
        Arc::clone(&self.exporter)
    }

    fn mark_dirty(&self) {
        self.autosaver.schedule(self.timeline.snapshot());
    }

    /// Copy files into the project and register them as videos.
    /// Every path is checked before anything is copied.
    pub fn import(&mut self, paths: &[PathBuf]) -> Result<Vec<VideoId>> {
        import_paths(paths)?;

        let mut imported = Vec::with_capacity(paths.len());
        for path in paths {
            imported.push(self.store.import_media(path)?);
        }
        let ids = self.timeline.add_videos(imported);
        self.mark_dirty();

        self.status_message = format!("Imported {} file(s)", ids.len());
        info!(count = ids.len(), "Videos imported");
        Ok(ids)
    }

    /// Pick a video for preview and load it into the player
    pub fn select_video(&mut self, id: &VideoId) -> Result<()> {
        if !self.timeline.select_video(id) {
            return Err(EditorError::VideoNotFound(id.to_string()));
        }
        self.playback.set_loading(false);
        self.playback.on_video_selected(id);
        if let Some(path) = self.timeline.video(id).map(|v| self.store.resolve(&v.path)) {
            self.load_source(path);
        }
        Ok(())
    }

    fn load_source(&mut self, path: PathBuf) {
        if self.loaded_source.as_deref() != Some(path.as_path()) {
            self.playback.player_mut().load(&path);
            self.loaded_source = Some(path);
        }
    }

    /// The player reported the selected video's duration
    pub fn on_duration_known(&mut self, source_duration: f64) -> Option<ClipId> {
        let created = self.playback.on_duration_known(source_duration, &mut self.timeline)?;
        self.mark_dirty();
        Some(created)
    }

    /// Probe the selected video and create its initial clip if it has none
    pub async fn probe_selected(&mut self) -> Result<Option<ClipId>> {
        let Some(video) = self.timeline.selected_video() else {
            return Ok(None);
        };
        let path = self.store.resolve(&video.path);
        let info = self.ffmpeg.probe(&path).await?;
        info!(
            path = %path.display(),
            duration = info.duration,
            width = info.width,
            height = info.height,
            video_codec = info.video_codec.as_deref().unwrap_or("-"),
            audio_codec = info.audio_codec.as_deref().unwrap_or("-"),
            "Probed media"
        );
        Ok(self.on_duration_known(info.duration))
    }

    pub fn split_at(&mut self, timeline_pos: f64) -> Option<(ClipId, ClipId)> {
        let split = self.timeline.split_at(timeline_pos)?;
        self.mark_dirty();
        self.status_message = format!("Split at {}", crate::utils::format_time(timeline_pos));
        Some(split)
    }

    pub fn delete_clip(&mut self, id: &ClipId) -> Result<Clip> {
        let removed = self
            .timeline
            .delete_clip(id)
            .ok_or_else(|| EditorError::ClipNotFound(id.to_string()))?;
        self.mark_dirty();
        self.status_message = format!("Deleted {}", removed.id);
        Ok(removed)
    }

    pub fn delete_selected_clip(&mut self) -> Option<Clip> {
        let removed = self.timeline.delete_selected_clip()?;
        self.mark_dirty();
        Some(removed)
    }

    pub fn glue_clips(&mut self) {
        self.timeline.glue_clips();
        self.mark_dirty();
        self.status_message = "Clips glued".to_string();
    }

    pub fn remove_video(&mut self, id: &VideoId) -> Result<Video> {
        let removed = self
            .timeline
            .remove_video(id)
            .ok_or_else(|| EditorError::VideoNotFound(id.to_string()))?;
        if self.loaded_source.as_deref() == Some(self.store.resolve(&removed.path).as_path()) {
            self.playback.pause();
            self.loaded_source = None;
        }
        self.mark_dirty();
        self.status_message = format!("Removed {}", removed.name);
        Ok(removed)
    }

    pub fn clear_all(&mut self) {
        self.playback.pause();
        self.loaded_source = None;
        self.timeline.clear_all();
        self.mark_dirty();
    }

    pub fn select_clip(&mut self, id: &ClipId) -> bool {
        self.timeline.select_clip(id)
    }

    /// Select the previous clip and move the playhead to its start
    pub fn select_previous_clip(&mut self) -> Option<f64> {
        let start = self.timeline.select_previous_clip()?;
        self.seek(start);
        Some(start)
    }

    /// Select the next clip and move the playhead to its start
    pub fn select_next_clip(&mut self) -> Option<f64> {
        let start = self.timeline.select_next_clip()?;
        self.seek(start);
        Some(start)
    }

    /// Move the playhead, loading the owning clip's source if needed
    pub fn seek(&mut self, timeline_pos: f64) -> bool {
        let source = clip_at(timeline_pos, self.timeline.clips())
            .map(|clip| self.source_of(clip));
        if let Some(path) = source {
            self.load_source(path);
        }
        self.playback.on_external_seek(timeline_pos, self.timeline.clips())
    }

    fn source_of(&self, clip: &Clip) -> PathBuf {
        let path = clip
            .video_id
            .as_ref()
            .and_then(|id| self.timeline.video(id))
            .map(|v| v.path.as_path())
            .unwrap_or(clip.source_path.as_path());
        self.store.resolve(path)
    }

    /// Feed the player's current source time to the coordinator
    pub fn tick(&mut self) -> Option<f64> {
        let source_time = self.playback.player().current_source_time();
        self.playback.on_player_time_advance(source_time, self.timeline.clips())
    }

    pub fn play(&mut self) {
        self.playback.play();
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn toggle_play(&mut self) -> bool {
        self.playback.toggle_play()
    }

    /// Render the timeline to `destination`. The clip list is frozen here;
    /// later edits do not affect a running export.
    pub async fn export(
        &self,
        destination: &Path,
        quality: QualityPreset,
        progress: Sender<ExportProgress>,
    ) -> ExportOutcome {
        let snapshot = self
            .timeline
            .export_snapshot()
            .into_iter()
            .map(|mut resolved| {
                resolved.source_path = self.store.resolve(&resolved.source_path);
                resolved
            })
            .collect();
        let settings = ExportSettings::from_config(&self.config, quality);
        self.exporter.run(snapshot, &settings, destination, progress).await
    }

    /// Write any pending autosave now
    pub async fn flush(&self) -> Result<()> {
        self.autosaver.flush().await
    }

    pub async fn close(self) {
        if let Err(e) = self.autosaver.flush().await {
            warn!(error = %e, "Final save failed");
        }
        self.autosaver.shutdown().await;
    }
}
