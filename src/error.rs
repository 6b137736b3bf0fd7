use serde::ser::{SerializeStruct, Serializer};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid project file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Media file not found: {}", .0.display())]
    MediaNotFound(PathBuf),

    #[error("Unsupported media file: {}", .0.display())]
    UnsupportedMedia(PathBuf),

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("{0}")]
    Engine(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Nothing to export: the timeline has no clips")]
    EmptyTimeline,

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Clip not found: {0}")]
    ClipNotFound(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "PROJECT_INVALID",
            Self::MediaNotFound(_) => "MEDIA_NOT_FOUND",
            Self::UnsupportedMedia(_) => "MEDIA_UNSUPPORTED",
            Self::Probe(_) => "PROBE_FAILED",
            Self::Engine(_) => "ENGINE_FAILED",
            Self::Cancelled => "EXPORT_CANCELLED",
            Self::EmptyTimeline => "TIMELINE_EMPTY",
            Self::VideoNotFound(_) => "VIDEO_NOT_FOUND",
            Self::ClipNotFound(_) => "CLIP_NOT_FOUND",
        }
    }
}

impl serde::Serialize for EditorError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("EditorError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
