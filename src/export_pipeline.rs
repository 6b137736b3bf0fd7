use crate::error::{EditorError, Result};
use crate::ffmpeg::{concat_manifest, CancelFlag, ConcatRequest, ExportProgress, TranscodeEngine, TrimRequest};
use crate::project::{ExportSettings, ResolvedClip};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub const STAGE_CONCAT: &str = "Concatenating clips";
pub const STAGE_COMPLETE: &str = "Export complete";

/// Where an export currently is
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ExportState {
    Idle,
    /// `index` is 1-based
    Trimming { index: usize, total: usize },
    Concatenating,
    Complete { output_path: PathBuf },
    Failed { error: String },
}

/// Terminal result of one export. Never a partial success.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Complete { output_path: PathBuf },
    Failed { error: String },
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Complete { .. })
    }
}

impl Serialize for ExportOutcome {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ExportOutcome", 2)?;
        match self {
            ExportOutcome::Complete { output_path } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("outputPath", output_path)?;
            }
            ExportOutcome::Failed { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Forwards progress to the channel, dropping anything that would go backwards
struct ProgressReporter {
    tx: Sender<ExportProgress>,
    last: Mutex<Option<ExportProgress>>,
}

impl ProgressReporter {
    fn new(tx: Sender<ExportProgress>) -> Self {
        Self {
            tx,
            last: Mutex::new(None),
        }
    }

    fn report(&self, percent: u8, stage: &str) {
        let mut last = self.last.lock();
        if let Some(prev) = last.as_ref() {
            if percent < prev.percent || (percent == prev.percent && stage == prev.stage) {
                return;
            }
        }
        let update = ExportProgress::new(percent, stage);
        // The receiver going away only means nobody is watching
        let _ = self.tx.send(update.clone());
        *last = Some(update);
    }
}

/// Temp files written by one export, plus whether the destination was touched
#[derive(Default)]
struct Artifacts {
    temp_files: Vec<PathBuf>,
    destination: Option<PathBuf>,
}

impl Artifacts {
    async fn remove_temp_files(&mut self) {
        for path in self.temp_files.drain(..) {
            remove_best_effort(&path).await;
        }
    }
}

async fn remove_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed export artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove export artifact"),
    }
}

/// Progress of clip `index` (0-based) mapped into the trim half, 0..=50
fn trim_percent(index: usize, clip_progress: f64, total: usize) -> u8 {
    let done = index as f64 + clip_progress.clamp(0.0, 1.0);
    ((done / total as f64) * 50.0).round() as u8
}

/// Concat progress mapped into 50..=100
fn concat_percent(progress: f64) -> u8 {
    50 + (progress.clamp(0.0, 1.0) * 50.0).round() as u8
}

fn export_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{}_{}", std::process::id(), nanos)
}

/// Two-phase export: re-encode every clip to a temp segment, then
/// stream-copy the segments into the destination.
pub struct ExportPipeline {
    engine: Arc<dyn TranscodeEngine>,
    temp_dir: PathBuf,
    state: Mutex<ExportState>,
    cancel: Mutex<CancelFlag>,
}

impl ExportPipeline {
    pub fn new(engine: Arc<dyn TranscodeEngine>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            temp_dir: temp_dir.into(),
            state: Mutex::new(ExportState::Idle),
            cancel: Mutex::new(CancelFlag::new()),
        }
    }

    pub fn state(&self) -> ExportState {
        self.state.lock().clone()
    }

    /// Cancel the export currently running, if any
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    fn set_state(&self, state: ExportState) {
        *self.state.lock() = state;
    }

    /// Run an export over a frozen clip snapshot. Progress updates go to
    /// `progress`; the outcome is always terminal.
    pub async fn run(
        &self,
        clips: Vec<ResolvedClip>,
        settings: &ExportSettings,
        destination: &Path,
        progress: Sender<ExportProgress>,
    ) -> ExportOutcome {
        let cancel = {
            let mut current = self.cancel.lock();
            *current = CancelFlag::new();
            current.clone()
        };
        let reporter = ProgressReporter::new(progress);
        let mut artifacts = Artifacts::default();

        info!(
            clips = clips.len(),
            quality = ?settings.quality,
            destination = %destination.display(),
            "Starting export"
        );

        let result = self
            .execute(clips, settings, destination, &reporter, &cancel, &mut artifacts)
            .await;

        artifacts.remove_temp_files().await;

        match result {
            Ok(()) => {
                reporter.report(100, STAGE_COMPLETE);
                self.set_state(ExportState::Complete {
                    output_path: destination.to_path_buf(),
                });
                info!(output = %destination.display(), "Export complete");
                ExportOutcome::Complete {
                    output_path: destination.to_path_buf(),
                }
            }
            Err(e) => {
                if let Some(partial) = artifacts.destination.take() {
                    remove_best_effort(&partial).await;
                }
                let error = e.to_string();
                self.set_state(ExportState::Failed { error: error.clone() });
                warn!(error = %error, "Export failed");
                ExportOutcome::Failed { error }
            }
        }
    }

    async fn execute(
        &self,
        mut clips: Vec<ResolvedClip>,
        settings: &ExportSettings,
        destination: &Path,
        reporter: &ProgressReporter,
        cancel: &CancelFlag,
        artifacts: &mut Artifacts,
    ) -> Result<()> {
        if clips.is_empty() {
            return Err(EditorError::EmptyTimeline);
        }
        clips.sort_by(|a, b| a.clip.timeline_start.total_cmp(&b.clip.timeline_start));

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let id = export_id();
        let total = clips.len();
        let mut segments = Vec::with_capacity(total);

        for (index, resolved) in clips.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(EditorError::Cancelled);
            }
            let is_file = tokio::fs::metadata(&resolved.source_path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(EditorError::MediaNotFound(resolved.source_path.clone()));
            }

            self.set_state(ExportState::Trimming { index: index + 1, total });
            let stage = format!("Processing clip {} of {}", index + 1, total);
            reporter.report(trim_percent(index, 0.0, total), &stage);

            let segment = self.temp_dir.join(format!("clipforge_{}_{:03}.mp4", id, index));
            artifacts.temp_files.push(segment.clone());

            let request = TrimRequest {
                input: resolved.source_path.clone(),
                output: segment.clone(),
                start: resolved.clip.source_start,
                duration: resolved.clip.duration,
                video_codec: settings.video_codec.clone(),
                audio_codec: settings.audio_codec.clone(),
                crf: settings.quality.crf(),
                preset: settings.quality.encoder_preset().to_string(),
            };
            debug!(clip = %resolved.clip.id, segment = %segment.display(), "Trimming clip");

            self.engine
                .trim(
                    &request,
                    &|p: f64| reporter.report(trim_percent(index, p, total), &stage),
                    cancel,
                )
                .await?;
            reporter.report(trim_percent(index, 1.0, total), &stage);
            segments.push(segment);
        }

        if cancel.is_cancelled() {
            return Err(EditorError::Cancelled);
        }

        self.set_state(ExportState::Concatenating);
        reporter.report(50, STAGE_CONCAT);

        let manifest = self.temp_dir.join(format!("clipforge_{}_concat.txt", id));
        artifacts.temp_files.push(manifest.clone());
        tokio::fs::write(&manifest, concat_manifest(&segments)).await?;

        let request = ConcatRequest {
            manifest,
            output: destination.to_path_buf(),
            duration: clips.iter().map(|c| c.clip.duration).sum(),
        };
        artifacts.destination = Some(destination.to_path_buf());
        self.engine
            .concat(&request, &|p: f64| reporter.report(concat_percent(p), STAGE_CONCAT), cancel)
            .await?;
        artifacts.destination = None;

        Ok(())
    }
}

/// Open the folder holding an exported file with the system file manager
pub fn reveal(output_path: &Path) -> Result<()> {
    let folder = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    open::that(folder)?;
    Ok(())
}
