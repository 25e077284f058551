use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tokio_stream::wrappers::ReadDirStream;
use uuid::Uuid;
use crate::utils::config::Config;
use crate::utils::logging::*;

/// Scratch directories of one upload, named after its session id.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub frames_folder: PathBuf,
    pub annotated_folder: PathBuf,
}

/// Owns the frame and annotated stores. Each upload works in its own
/// session directory; directories of sessions no longer in flight are
/// removed whenever a new session opens.
pub struct Workspace {
    uploads_root: PathBuf,
    frames_root: PathBuf,
    annotated_root: PathBuf,
    active: RwLock<HashSet<Uuid>>,
}

impl Workspace {
    pub fn new(config: &Config) -> Self {
        Self {
            uploads_root: config.uploads_folder(),
            frames_root: config.frames_folder(),
            annotated_root: config.annotated_folder(),
            active: RwLock::new(HashSet::new()),
        }
    }

    pub fn uploads_root(&self) -> &Path {
        &self.uploads_root
    }

    pub fn frames_root(&self) -> &Path {
        &self.frames_root
    }

    pub fn annotated_root(&self) -> &Path {
        &self.annotated_root
    }

    pub async fn prepare(&self) -> Result<(), LogEntry> {
        for folder in [&self.uploads_root, &self.frames_root, &self.annotated_root] {
            fs::create_dir_all(folder).await
                .map_err(|err| error_entry!(IOEntry::CreateDirectoryError(folder.display(), err)))?;
        }
        Ok(())
    }

    pub async fn open_session(&self) -> Result<Session, LogEntry> {
        let id = Uuid::new_v4();
        let session = Session {
            id,
            frames_folder: self.frames_root.join(id.to_string()),
            annotated_folder: self.annotated_root.join(id.to_string()),
        };
        let mut active = self.active.write().await;
        active.insert(id);
        let result = self.open_locked(&session, &active).await;
        if result.is_err() {
            active.remove(&id);
        }
        result.map(|_| session)
    }

    async fn open_locked(&self, session: &Session, active: &HashSet<Uuid>) -> Result<(), LogEntry> {
        self.prepare().await?;
        let mut purged = Self::purge_stale(&self.frames_root, active).await?;
        purged.extend(Self::purge_stale(&self.annotated_root, active).await?);
        for session_id in purged {
            Logger::remove_session_logs(session_id).await;
        }
        for folder in [&session.frames_folder, &session.annotated_folder] {
            fs::create_dir_all(folder).await
                .map_err(|err| error_entry!(IOEntry::CreateDirectoryError(folder.display(), err)))?;
        }
        Ok(())
    }

    /// Leaves the session's files in place for the static routes until the next purge.
    pub async fn release(&self, session: &Session) {
        self.active.write().await.remove(&session.id);
    }

    /// Removes everything under `root` not owned by an in-flight session.
    /// Returns the ids of the session directories that were removed.
    async fn purge_stale(root: &Path, active: &HashSet<Uuid>) -> Result<HashSet<Uuid>, LogEntry> {
        let read_dir = fs::read_dir(root).await
            .map_err(|err| error_entry!(IOEntry::ReadDirectoryError(root.display(), err)))?;
        let stale: Vec<PathBuf> = ReadDirStream::new(read_dir)
            .filter_map(|entry| async move { entry.ok().map(|entry| entry.path()) })
            .filter(|path| {
                let in_flight = Self::session_id(path)
                    .map(|id| active.contains(&id))
                    .unwrap_or(false);
                async move { !in_flight }
            })
            .collect()
            .await;
        let mut purged = HashSet::new();
        for path in stale {
            Self::remove(&path).await?;
            if let Some(session_id) = Self::session_id(&path) {
                purged.insert(session_id);
            }
        }
        Ok(purged)
    }

    fn session_id(path: &Path) -> Option<Uuid> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| Uuid::parse_str(name).ok())
    }

    async fn remove(path: &Path) -> Result<(), LogEntry> {
        if path.is_dir() {
            fs::remove_dir_all(path).await
                .map_err(|err| error_entry!(IOEntry::DeleteDirectoryError(path.display(), err)))
        } else {
            fs::remove_file(path).await
                .map_err(|err| error_entry!(IOEntry::DeleteFileError(path.display(), err)))
        }
    }

    /// Drops both ephemeral stores. Uploads are kept.
    pub async fn clear(&self) -> Result<(), LogEntry> {
        for folder in [&self.frames_root, &self.annotated_root] {
            if fs::try_exists(folder).await.unwrap_or(false) {
                Self::remove(folder).await?;
            }
        }
        Ok(())
    }

    /// Files directly inside `folder`, sorted by name.
    pub async fn list_files(folder: &Path) -> Result<Vec<String>, LogEntry> {
        let read_dir = fs::read_dir(folder).await
            .map_err(|err| error_entry!(IOEntry::ReadDirectoryError(folder.display(), err)))?;
        let mut names: Vec<String> = ReadDirStream::new(read_dir)
            .filter_map(|entry| async move {
                entry.ok()
                    .filter(|entry| entry.path().is_file())
                    .map(|entry| entry.file_name().to_string_lossy().to_string())
            })
            .collect()
            .await;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(root: &Path) -> Workspace {
        let config = Config { storage_root: root.to_path_buf(), ..Config::default() };
        Workspace::new(&config)
    }

    #[tokio::test]
    async fn opening_a_session_creates_its_folders() {
        let root = tempfile::tempdir().unwrap();
        let workspace = workspace(root.path());
        let session = workspace.open_session().await.unwrap();
        assert!(session.frames_folder.is_dir());
        assert!(session.annotated_folder.is_dir());
        assert!(workspace.uploads_root().is_dir());
    }

    #[tokio::test]
    async fn released_sessions_are_purged_by_the_next_upload() {
        let root = tempfile::tempdir().unwrap();
        let workspace = workspace(root.path());
        let first = workspace.open_session().await.unwrap();
        std::fs::write(first.frames_folder.join("a.jpg"), b"x").unwrap();
        std::fs::write(workspace.frames_root().join("leftover.jpg"), b"x").unwrap();
        workspace.release(&first).await;
        let second = workspace.open_session().await.unwrap();
        assert!(!first.frames_folder.exists());
        assert!(!first.annotated_folder.exists());
        assert!(!workspace.frames_root().join("leftover.jpg").exists());
        assert!(second.frames_folder.is_dir());
    }

    #[tokio::test]
    async fn purged_session_log_is_dropped() {
        let root = tempfile::tempdir().unwrap();
        let workspace = workspace(root.path());
        let first = workspace.open_session().await.unwrap();
        logging_information!(first.id, "Upload received", "");
        workspace.release(&first).await;
        let second = workspace.open_session().await.unwrap();
        logging_information!(second.id, "Upload received", "");
        assert!(Logger::get_session_logs(first.id).await.is_none());
        assert!(Logger::get_session_logs(second.id).await.is_some());
    }

    #[tokio::test]
    async fn in_flight_session_log_survives_a_purge() {
        let root = tempfile::tempdir().unwrap();
        let workspace = workspace(root.path());
        let first = workspace.open_session().await.unwrap();
        logging_information!(first.id, "Upload received", "");
        let _second = workspace.open_session().await.unwrap();
        assert!(Logger::get_session_logs(first.id).await.is_some());
    }

    #[tokio::test]
    async fn in_flight_sessions_survive_a_purge() {
        let root = tempfile::tempdir().unwrap();
        let workspace = workspace(root.path());
        let first = workspace.open_session().await.unwrap();
        std::fs::write(first.frames_folder.join("a.jpg"), b"x").unwrap();
        let _second = workspace.open_session().await.unwrap();
        assert!(first.frames_folder.join("a.jpg").is_file());
    }

    #[tokio::test]
    async fn uploads_survive_clear() {
        let root = tempfile::tempdir().unwrap();
        let workspace = workspace(root.path());
        let session = workspace.open_session().await.unwrap();
        std::fs::write(workspace.uploads_root().join("clip.mp4"), b"x").unwrap();
        workspace.clear().await.unwrap();
        assert!(!session.frames_folder.exists());
        assert!(!workspace.annotated_root().exists());
        assert!(workspace.uploads_root().join("clip.mp4").is_file());
    }

    #[tokio::test]
    async fn listing_is_sorted_and_skips_folders() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("b.jpg"), b"x").unwrap();
        std::fs::write(root.path().join("a.jpg"), b"x").unwrap();
        std::fs::create_dir(root.path().join("nested")).unwrap();
        let names = Workspace::list_files(root.path()).await.unwrap();
        assert_eq!(names, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
    }
}
