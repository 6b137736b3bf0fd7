use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives the fraction (0..=1) of the current job that is done
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Re-encode `[start, start + duration)` of `input` into `output`
#[derive(Debug, Clone, PartialEq)]
pub struct TrimRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start: f64,
    pub duration: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub crf: u32,
    pub preset: String,
}

/// Stream-copy every segment listed in `manifest` into `output`
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatRequest {
    pub manifest: PathBuf,
    pub output: PathBuf,
    /// Expected output length, used to turn engine timestamps into progress
    pub duration: f64,
}

/// Shared cancellation switch between an export and the engine running it
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The external transcoder. Both jobs report progress while running and
/// finish with success or an error carrying the engine's own message.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn trim(&self, request: &TrimRequest, progress: ProgressFn<'_>, cancel: &CancelFlag) -> Result<()>;

    async fn concat(&self, request: &ConcatRequest, progress: ProgressFn<'_>, cancel: &CancelFlag) -> Result<()>;
}
