use crate::config::EditorConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Encoder tuning used when trimming clips for export.
///
/// | preset | crf | x264 preset |
/// |--------|-----|-------------|
/// | high   | 18  | slow        |
/// | medium | 23  | medium      |
/// | low    | 28  | veryfast    |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    High,
    #[default]
    Medium,
    Low,
}

impl QualityPreset {
    pub fn all() -> &'static [QualityPreset] {
        &[QualityPreset::High, QualityPreset::Medium, QualityPreset::Low]
    }

    pub fn crf(self) -> u32 {
        match self {
            QualityPreset::High => 18,
            QualityPreset::Medium => 23,
            QualityPreset::Low => 28,
        }
    }

    pub fn encoder_preset(self) -> &'static str {
        match self {
            QualityPreset::High => "slow",
            QualityPreset::Medium => "medium",
            QualityPreset::Low => "veryfast",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QualityPreset::High => "High (larger file, slower)",
            QualityPreset::Medium => "Medium (balanced)",
            QualityPreset::Low => "Low (smaller file, faster)",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(QualityPreset::High),
            "medium" => Ok(QualityPreset::Medium),
            "low" => Ok(QualityPreset::Low),
            other => Err(format!("unknown quality preset '{}' (expected high, medium or low)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub quality: QualityPreset,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

impl ExportSettings {
    pub fn from_config(config: &EditorConfig, quality: QualityPreset) -> Self {
        Self {
            quality,
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }
}
