use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for an editing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Where export segments and the concat manifest are written
    pub temp_dir: PathBuf,
    pub autosave_delay_ms: u64,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            temp_dir: std::env::temp_dir(),
            autosave_delay_ms: 500,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

impl EditorConfig {
    /// Defaults overridden by `CLIPFORGE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("CLIPFORGE_FFMPEG") {
            config.ffmpeg_path = path;
        }
        if let Some(path) = lookup("CLIPFORGE_FFPROBE") {
            config.ffprobe_path = path;
        }
        if let Some(dir) = lookup("CLIPFORGE_TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup("CLIPFORGE_AUTOSAVE_MS").and_then(|v| v.parse().ok()) {
            config.autosave_delay_ms = ms;
        }

        config
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}
