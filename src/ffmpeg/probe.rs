use crate::error::{EditorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFProbeOutput {
    format: Option<FFProbeFormat>,
    streams: Option<Vec<FFProbeStream>>,
}

#[derive(Debug, Deserialize)]
struct FFProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

pub async fn probe_file(ffprobe_path: &str, path: &Path) -> Result<MediaInfo> {
    if !path.is_file() {
        return Err(EditorError::MediaNotFound(path.to_path_buf()));
    }

    let output = Command::new(ffprobe_path)
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EditorError::Probe(format!("ffprobe failed: {}", stderr.trim())));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Probe a file that must carry a video stream and a positive duration
pub async fn probe_video(ffprobe_path: &str, path: &Path) -> Result<MediaInfo> {
    let info = probe_file(ffprobe_path, path).await?;
    check_playable(info, path)
}

fn check_playable(info: MediaInfo, path: &Path) -> Result<MediaInfo> {
    if info.duration > 0.0 && info.video_codec.is_some() {
        Ok(info)
    } else {
        Err(EditorError::UnsupportedMedia(path.to_path_buf()))
    }
}

fn parse_probe_output(json_str: &str) -> Result<MediaInfo> {
    let probe_output: FFProbeOutput = serde_json::from_str(json_str)
        .map_err(|e| EditorError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    let mut info = MediaInfo::default();

    if let Some(format) = probe_output.format {
        info.duration = format.duration
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite())
            .unwrap_or(0.0);
    }

    for stream in probe_output.streams.unwrap_or_default() {
        match stream.codec_type.as_deref().unwrap_or("") {
            "video" if info.video_codec.is_none() => {
                info.video_codec = stream.codec_name;
                info.width = stream.width.unwrap_or(0);
                info.height = stream.height.unwrap_or(0);
            }
            "audio" if info.audio_codec.is_none() => {
                info.audio_codec = stream.codec_name;
            }
            _ => {}
        }
    }

    Ok(info)
}
