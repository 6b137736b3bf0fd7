use super::legacy::{migrate, ClipRecord, VideoRecord};
use super::media::{file_name, is_supported_video, ImportedMedia, Video};
use super::timeline::{Clip, Project, Timeline};
use crate::error::{EditorError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const PROJECT_FILE: &str = "project.json";
pub const MEDIA_DIR: &str = "media";
const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectMeta {
    pub id: String,
    pub name: String,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    clips: Vec<ClipRecord>,
    #[serde(default)]
    videos: Vec<VideoRecord>,
    #[serde(default, deserialize_with = "lenient_millis")]
    created_at: u64,
    #[serde(default, deserialize_with = "lenient_millis")]
    updated_at: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDocument<'a> {
    id: &'a str,
    name: &'a str,
    clips: &'a [Clip],
    videos: &'a [Video],
    created_at: u64,
    updated_at: u64,
}

/// Older files stored timestamps as strings; anything non-numeric reads as 0.
fn lenient_millis<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64().unwrap_or(0))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A project directory: `project.json` plus a `media/` folder of copied sources.
#[derive(Debug)]
pub struct ProjectStore {
    root: PathBuf,
    meta: Mutex<ProjectMeta>,
    saves: AtomicUsize,
}

impl ProjectStore {
    /// Open the project in `root`, writing a default empty project if none exists.
    /// Legacy records are normalized and the id allocator is seeded here.
    pub fn load_or_create(root: impl Into<PathBuf>) -> Result<(Self, Timeline)> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let path = root.join(PROJECT_FILE);

        if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let stored: StoredProject = serde_json::from_str(&text)?;
            let (project, ids) = migrate(stored.videos, stored.clips);
            info!(
                path = %path.display(),
                videos = project.videos.len(),
                clips = project.clips.len(),
                "Project loaded"
            );

            let meta = ProjectMeta {
                id: stored.id.unwrap_or_else(|| format!("project_{}", now_millis())),
                name: stored.name.unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
                created_at: stored.created_at,
                updated_at: stored.updated_at,
            };
            let store = Self::with_meta(root, meta);
            return Ok((store, Timeline::from_project(project, ids)));
        }

        let now = now_millis();
        let meta = ProjectMeta {
            id: format!("project_{}", now),
            name: DEFAULT_PROJECT_NAME.to_string(),
            created_at: now,
            updated_at: now,
        };
        let store = Self::with_meta(root, meta);
        store.save(&Project::default())?;
        info!(path = %path.display(), "Created new project");
        Ok((store, Timeline::new()))
    }

    fn with_meta(root: PathBuf, meta: ProjectMeta) -> Self {
        Self {
            root,
            meta: Mutex::new(meta),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_file(&self) -> PathBuf {
        self.root.join(PROJECT_FILE)
    }

    pub fn meta(&self) -> ProjectMeta {
        self.meta.lock().clone()
    }

    /// Number of completed writes since the store was opened
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Rewrite the whole project file, refreshing `updatedAt`.
    /// The document is written beside the target and renamed over it.
    pub fn save(&self, project: &Project) -> Result<()> {
        let mut meta = self.meta.lock();
        meta.updated_at = now_millis().max(meta.updated_at);

        let document = ProjectDocument {
            id: &meta.id,
            name: &meta.name,
            clips: &project.clips,
            videos: &project.videos,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        };
        let json = serde_json::to_string_pretty(&document)?;

        let target = self.project_file();
        let staging = self.root.join(format!("{}.tmp", PROJECT_FILE));
        std::fs::write(&staging, json)?;
        std::fs::rename(&staging, &target)?;

        self.saves.fetch_add(1, Ordering::SeqCst);
        debug!(path = %target.display(), clips = project.clips.len(), "Project saved");
        Ok(())
    }

    /// Copy a source file into `media/` and return it with a project-relative path
    pub fn import_media(&self, source: &Path) -> Result<ImportedMedia> {
        if !is_supported_video(source) {
            return Err(EditorError::UnsupportedMedia(source.to_path_buf()));
        }
        let original = ImportedMedia::from_path(source)?;

        let media_dir = self.root.join(MEDIA_DIR);
        std::fs::create_dir_all(&media_dir)?;

        let name = unique_name(&media_dir, &original.name);
        let size = std::fs::copy(source, media_dir.join(&name))?;
        info!(from = %source.display(), to = %name, "Imported media into project");

        Ok(ImportedMedia {
            path: Path::new(MEDIA_DIR).join(&name),
            name,
            size,
        })
    }

    /// Relative paths are taken as relative to the project directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// `name`, or `stem (n).ext` for the first `n` not yet taken in `dir`
fn unique_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name(path));
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| format!("{} ({}){}", stem, n, ext))
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or_else(|| name.to_string())
}

enum SaveCommand {
    Schedule(Project),
    Flush(oneshot::Sender<Result<()>>),
}

/// Debounced background writer.
///
/// Every [`AutoSaver::schedule`] replaces the pending snapshot and restarts
/// the quiet window; only the snapshot still pending when the window
/// elapses is written. Create it after the project has loaded.
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<SaveCommand>,
    handle: JoinHandle<()>,
}

impl AutoSaver {
    /// Must be called from within a tokio runtime
    pub fn spawn(store: Arc<ProjectStore>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_autosave(store, delay, rx));
        Self { tx, handle }
    }

    pub fn schedule(&self, project: Project) {
        if self.tx.send(SaveCommand::Schedule(project)).is_err() {
            warn!("Autosave task has stopped, change not scheduled");
        }
    }

    /// Write any pending snapshot now
    pub async fn flush(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(SaveCommand::Flush(reply))
            .map_err(|_| autosave_stopped())?;
        done.await.map_err(|_| autosave_stopped())?
    }

    /// Write any pending snapshot and stop the task
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Autosave task ended abnormally");
        }
    }
}

fn autosave_stopped() -> EditorError {
    EditorError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "autosave task has stopped",
    ))
}

async fn run_autosave(
    store: Arc<ProjectStore>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<SaveCommand>,
) {
    let mut pending: Option<Project> = None;

    loop {
        let command = if pending.is_some() {
            match tokio::time::timeout(delay, rx.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    write_pending(&store, &mut pending).await;
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(SaveCommand::Schedule(project)) => pending = Some(project),
            Some(SaveCommand::Flush(reply)) => {
                let result = match pending.take() {
                    Some(project) => save_blocking(&store, project).await,
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            None => {
                write_pending(&store, &mut pending).await;
                break;
            }
        }
    }
}

async fn write_pending(store: &Arc<ProjectStore>, pending: &mut Option<Project>) {
    if let Some(project) = pending.take() {
        if let Err(e) = save_blocking(store, project).await {
            warn!(error = %e, "Autosave failed");
        }
    }
}

/// Run [`ProjectStore::save`] on the blocking pool
async fn save_blocking(store: &Arc<ProjectStore>, project: Project) -> Result<()> {
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || store.save(&project))
        .await
        .map_err(|e| EditorError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ClipId, VideoId};

    fn sample_timeline(name: &str, duration: f64) -> Timeline {
        let mut timeline = Timeline::new();
        let ids = timeline.add_videos(vec![ImportedMedia {
            name: name.to_string(),
            path: PathBuf::from(format!("/media/{}", name)),
            size: 42,
        }]);
        timeline.create_initial_clip(&ids[0], duration);
        timeline
    }

    #[test]
    fn test_creates_default_project() {
        let dir = tempfile::tempdir().unwrap();
        let (store, timeline) = ProjectStore::load_or_create(dir.path()).unwrap();

        assert!(timeline.clips().is_empty());
        assert!(store.project_file().exists());
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.project_file()).unwrap()).unwrap();
        assert_eq!(json["name"], DEFAULT_PROJECT_NAME);
        assert_eq!(json["clips"], serde_json::json!([]));
        assert!(json["createdAt"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = ProjectStore::load_or_create(dir.path()).unwrap();
        let mut timeline = sample_timeline("a.mp4", 8.0);
        timeline.split_at(3.0);
        store.save(&timeline.snapshot()).unwrap();

        let (reloaded_store, mut reloaded) = ProjectStore::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded.snapshot(), timeline.snapshot());
        assert_eq!(reloaded_store.meta().id, store.meta().id);

        // ids issued after reload continue past the stored ones
        let (left, _) = reloaded.split_at(1.0).unwrap();
        assert!(timeline.clip(&left).is_none());
        assert_ne!(left, ClipId::from("clip_1"));
    }

    #[test]
    fn test_save_refreshes_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let (store, timeline) = ProjectStore::load_or_create(dir.path()).unwrap();
        let before = store.meta();
        std::thread::sleep(Duration::from_millis(5));
        store.save(&timeline.snapshot()).unwrap();
        let after = store.meta();
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[test]
    fn test_loads_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            r#"{
                "id": "p1", "name": "Trip",
                "createdAt": "2024-05-01T10:00:00.000Z",
                "videos": [{"name": "a.mp4", "path": "/m/a.mp4", "size": 5}],
                "clips": [{"sourceVideo": {"path": "/m/a.mp4"}, "sourceStart": 0, "sourceEnd": 6, "timelineStart": 0, "duration": 6}]
            }"#,
        )
        .unwrap();

        let (store, timeline) = ProjectStore::load_or_create(dir.path()).unwrap();
        assert_eq!(store.meta().name, "Trip");
        assert_eq!(store.meta().created_at, 0);
        let video = &timeline.videos()[0];
        assert_eq!(timeline.clips()[0].video_id.as_ref(), Some(&video.id));
    }

    #[test]
    fn test_loads_ids_with_multibyte_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            r#"{
                "id": "p2", "name": "Vacances",
                "videos": [{"id": "video_é", "name": "a.mp4", "path": "/m/a.mp4", "size": 5}],
                "clips": [{"id": "clipé", "videoId": "video_é", "sourcePath": "/m/a.mp4", "sourceStart": 0, "sourceEnd": 3, "timelineStart": 0, "duration": 3}]
            }"#,
        )
        .unwrap();

        let (_, mut timeline) = ProjectStore::load_or_create(dir.path()).unwrap();
        assert_eq!(timeline.videos()[0].id, VideoId::from("video_é"));
        assert_eq!(timeline.clips()[0].id, ClipId::from("clipé"));

        let (left, right) = timeline.split_at(1.0).unwrap();
        assert_eq!(left, ClipId::from("clip_1"));
        assert_eq!(right, ClipId::from("clip_2"));
    }

    #[test]
    fn test_import_media_copies_and_dedupes() {
        let project = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let source = outside.path().join("clip.mov");
        std::fs::write(&source, b"0123456789").unwrap();

        let (store, _) = ProjectStore::load_or_create(project.path()).unwrap();
        let first = store.import_media(&source).unwrap();
        let second = store.import_media(&source).unwrap();

        assert_eq!(first.path, PathBuf::from("media/clip.mov"));
        assert_eq!(second.path, PathBuf::from("media/clip (1).mov"));
        assert_eq!(first.size, 10);
        assert!(store.resolve(&second.path).exists());
        assert_eq!(store.resolve(Path::new("/abs/x.mp4")), PathBuf::from("/abs/x.mp4"));
    }

    #[tokio::test]
    async fn test_autosave_coalesces_rapid_edits() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = ProjectStore::load_or_create(dir.path()).unwrap();
        let store = Arc::new(store);
        let baseline = store.save_count();
        let saver = AutoSaver::spawn(store.clone(), Duration::from_millis(60));

        saver.schedule(sample_timeline("a.mp4", 1.0).snapshot());
        saver.schedule(sample_timeline("b.mp4", 2.0).snapshot());
        let last = sample_timeline("c.mp4", 3.0).snapshot();
        saver.schedule(last.clone());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.save_count(), baseline + 1);

        let (_, reloaded) = ProjectStore::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded.snapshot(), last);
        saver.shutdown().await;
    }

    #[tokio::test]
    async fn test_flush_writes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = ProjectStore::load_or_create(dir.path()).unwrap();
        let store = Arc::new(store);
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(60));

        let snapshot = sample_timeline("a.mp4", 4.0).snapshot();
        saver.schedule(snapshot.clone());
        saver.flush().await.unwrap();

        let (_, reloaded) = ProjectStore::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded.snapshot(), snapshot);
        saver.shutdown().await;
    }
}
