use super::ids::VideoId;
use crate::error::{EditorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "flv", "wmv"];

/// A source media file imported into the project. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub name: String,
    /// Absolute, or relative to the project directory
    pub path: PathBuf,
    pub size: u64,
}

impl Video {
    pub fn size_string(&self) -> String {
        crate::utils::format_size(self.size)
    }
}

/// Stat result for a file offered for import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedMedia {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl ImportedMedia {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EditorError::MediaNotFound(path.to_path_buf()),
            _ => EditorError::Io(e),
        })?;

        if !metadata.is_file() {
            return Err(EditorError::MediaNotFound(path.to_path_buf()));
        }

        Ok(Self {
            name: file_name(path),
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }
}

/// Stat every path, failing on the first missing or non-video file.
/// Shared by dialog-driven and drag-and-drop imports.
pub fn import_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ImportedMedia>> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            if !is_supported_video(path) {
                return Err(EditorError::UnsupportedMedia(path.to_path_buf()));
            }
            ImportedMedia::from_path(path)
        })
        .collect()
}

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_video(Path::new("/videos/a.mp4")));
        assert!(is_supported_video(Path::new("B.MOV")));
        assert!(!is_supported_video(Path::new("notes.txt")));
        assert!(!is_supported_video(Path::new("noext")));
    }

    #[test]
    fn test_import_stats_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.mp4");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let imported = import_paths(&[&path]).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].name, "holiday.mp4");
        assert_eq!(imported[0].size, 2048);
        assert_eq!(imported[0].path, path);
    }

    #[test]
    fn test_import_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.mkv");
        let err = import_paths(&[missing.clone()]).unwrap_err();
        assert!(matches!(err, EditorError::MediaNotFound(p) if p == missing));
    }

    #[test]
    fn test_import_rejects_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        std::fs::write(&path, b"png").unwrap();
        assert!(matches!(
            import_paths(&[path]),
            Err(EditorError::UnsupportedMedia(_))
        ));
    }
}
