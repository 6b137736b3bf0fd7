use super::commands::{build_concat_args, build_trim_args};
use super::engine::{CancelFlag, ConcatRequest, ProgressFn, TranscodeEngine, TrimRequest};
use super::probe::{probe_video, MediaInfo};
use super::progress::parse_progress_line;
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Lines of stderr kept for the error message of a failed run
const STDERR_TAIL_LINES: usize = 8;

#[derive(Clone)]
pub struct FFmpegWrapper {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FFmpegWrapper {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }

    pub fn with_paths(ffmpeg_path: String, ffprobe_path: String) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::with_paths(config.ffmpeg_path.clone(), config.ffprobe_path.clone())
    }

    /// Check if FFmpeg is available
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Probe a media file, rejecting anything without a video stream
    pub async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        probe_video(&self.ffprobe_path, path).await
    }

    /// Execute an FFmpeg command, feeding `-progress` output to `progress`
    async fn execute_ffmpeg(
        &self,
        args: &[String],
        duration: f64,
        progress: ProgressFn<'_>,
        cancel: &CancelFlag,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(EditorError::Cancelled);
        }
        debug!(ffmpeg = %self.ffmpeg_path, args = ?args, "Running ffmpeg");

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = command
            .spawn()
            .map_err(|e| EditorError::Engine(format!("Failed to start {}: {}", self.ffmpeg_path, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EditorError::Engine("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EditorError::Engine("Failed to capture stderr".to_string()))?;
        let stderr_task = tokio::spawn(collect_tail(stderr));

        let mut reader = BufReader::new(stdout).lines();
        while let Some(line) = reader.next_line().await? {
            if cancel.is_cancelled() {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill ffmpeg");
                }
                return Err(EditorError::Cancelled);
            }
            if let Some(fraction) = parse_progress_line(&line, duration) {
                progress(fraction);
            }
        }

        let status = child.wait().await?;
        let tail = stderr_task.await.unwrap_or_default();

        if cancel.is_cancelled() {
            return Err(EditorError::Cancelled);
        }
        if status.success() {
            Ok(())
        } else {
            Err(EditorError::Engine(failure_message(&status.to_string(), &tail)))
        }
    }
}

impl Default for FFmpegWrapper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscodeEngine for FFmpegWrapper {
    async fn trim(&self, request: &TrimRequest, progress: ProgressFn<'_>, cancel: &CancelFlag) -> Result<()> {
        let args = build_trim_args(request);
        self.execute_ffmpeg(&args, request.duration, progress, cancel).await
    }

    async fn concat(&self, request: &ConcatRequest, progress: ProgressFn<'_>, cancel: &CancelFlag) -> Result<()> {
        let args = build_concat_args(request);
        self.execute_ffmpeg(&args, request.duration, progress, cancel).await
    }
}

async fn collect_tail<R: AsyncRead + Unpin>(stream: R) -> Vec<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into()
}

/// The engine's own words when it gave any, else the exit status
fn failure_message(status: &str, tail: &[String]) -> String {
    match tail.last() {
        Some(last) => last.trim().to_string(),
        None => format!("FFmpeg exited with {}", status),
    }
}
