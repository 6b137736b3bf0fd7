use super::engine::{ConcatRequest, TrimRequest};
use std::path::{Path, PathBuf};

/// Build FFmpeg arguments for re-encoding one clip.
///
/// `-ss` goes before `-i` for fast seeking; since the segment is re-encoded
/// the cut is still frame accurate.
pub fn build_trim_args(request: &TrimRequest) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-ss".to_string(),
        format!("{:.3}", request.start),
        "-i".to_string(),
        request.input.to_string_lossy().to_string(),
        "-t".to_string(),
        format!("{:.3}", request.duration),
        "-c:v".to_string(),
        request.video_codec.clone(),
        "-preset".to_string(),
        request.preset.clone(),
        "-crf".to_string(),
        request.crf.to_string(),
        "-c:a".to_string(),
        request.audio_codec.clone(),
    ];
    args.extend(progress_args());
    args.push(request.output.to_string_lossy().to_string());
    args
}

/// Build FFmpeg arguments for concat-demuxer stream copy
pub fn build_concat_args(request: &ConcatRequest) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        request.manifest.to_string_lossy().to_string(),
        "-c".to_string(),
        "copy".to_string(),
    ];
    args.extend(progress_args());
    args.push(request.output.to_string_lossy().to_string());
    args
}

/// Machine-readable `key=value` progress on stdout instead of the stderr status line
fn progress_args() -> [String; 3] {
    ["-progress".to_string(), "pipe:1".to_string(), "-nostats".to_string()]
}

/// Concat demuxer manifest, one quoted `file` line per segment in order
pub fn concat_manifest(segments: &[PathBuf]) -> String {
    let mut manifest: String = segments
        .iter()
        .map(|p| format!("file {}", quote_path(p)))
        .collect::<Vec<_>>()
        .join("\n");
    manifest.push('\n');
    manifest
}

/// Single-quote a path for the concat demuxer; embedded quotes become `'\''`
fn quote_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "'\\''"))
}
