//! File discovery and watching (§10.5): an initial `walkdir` scan of a
//! workspace root for `.robot`/`.resource` files, plus a `notify`-backed
//! watcher that turns filesystem events into [`FileChangeEvent`]s. These
//! feed the three file-event entry points named in §6
//! (`on_library_file_changed`, `on_resource_file_changed`,
//! `on_variables_file_changed`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::RobotCodeError;
use crate::result::Result;

/// Suite and resource file extensions discovered by default.
pub const SUITE_EXTENSIONS: &[&str] = &["robot", "resource"];

/// Discovers suite/resource files under `root`. Mirrors the teacher's
/// walking-mode discovery: no include/exclude glob configuration here, a
/// plain extension filter over a recursive walk.
pub trait FileDiscovery {
    fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>>;
    fn watch_for_changes(&self, root: &Path) -> Result<FileWatcher>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultFileDiscovery;

impl FileDiscovery for DefaultFileDiscovery {
    fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file()
                && let Some(ext) = path.extension()
            {
                let ext = ext.to_string_lossy().to_lowercase();
                if SUITE_EXTENSIONS.contains(&ext.as_str()) {
                    files.push(path.to_path_buf());
                }
            }
        }
        Ok(files)
    }

    fn watch_for_changes(&self, root: &Path) -> Result<FileWatcher> {
        FileWatcher::new(root)
    }
}

/// A single filesystem change, debounced per path.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: FileChangeKind,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Watches a workspace root for changes, debouncing rapid-fire events per
/// path the way editors and build tools tend to emit them in bursts.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<FileChangeEvent>,
    debounce: Duration,
    last_events: HashMap<PathBuf, Instant>,
}

impl FileWatcher {
    pub fn new(root: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let kind = match event.kind {
                    EventKind::Create(_) => FileChangeKind::Created,
                    EventKind::Modify(_) => FileChangeKind::Modified,
                    EventKind::Remove(_) => FileChangeKind::Deleted,
                    _ => FileChangeKind::Modified,
                };
                for path in event.paths {
                    if tx
                        .send(FileChangeEvent { path, kind, timestamp: Instant::now() })
                        .is_err()
                    {
                        warn!("file watcher receiver dropped");
                    }
                }
            }
            Err(e) => warn!("file watcher error: {e}"),
        })
        .map_err(|e| RobotCodeError::io(root, std::io::Error::other(format!("failed to create watcher: {e}"))))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| RobotCodeError::io(root, std::io::Error::other(format!("failed to watch directory: {e}"))))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            debounce: Duration::from_millis(100),
            last_events: HashMap::new(),
        })
    }

    pub fn set_debounce(&mut self, duration: Duration) {
        self.debounce = duration;
    }

    pub async fn next_event(&mut self) -> Option<FileChangeEvent> {
        loop {
            let event = self.receiver.recv().await?;
            let now = event.timestamp;
            if let Some(last) = self.last_events.get(&event.path)
                && now.duration_since(*last) < self.debounce
            {
                continue;
            }
            self.last_events.insert(event.path.clone(), now);
            self.last_events.retain(|_, last| now.duration_since(*last) < Duration::from_secs(60));
            return Some(event);
        }
    }

    pub fn has_pending_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

/// Classifies a changed path into the file-event entry point that should
/// handle it (§6), based on extension: `.resource` files are resources,
/// `.robot` suite files can themselves act as resources when imported, and
/// anything else watched under the workspace is treated as a variables
/// file candidate only if it matches a known variables extension.
pub fn classify_change(path: &Path) -> ImportChangeKind {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
        Some(ext) if ext == "resource" || ext == "robot" => ImportChangeKind::Resource,
        Some(ext) if ext == "py" => ImportChangeKind::Library,
        Some(ext) if ext == "yaml" || ext == "yml" || ext == "json" => ImportChangeKind::Variables,
        _ => ImportChangeKind::Resource,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportChangeKind {
    Library,
    Resource,
    Variables,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discover_files_finds_robot_and_resource_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("suite.robot"), "*** Test Cases ***\n").unwrap();
        fs::write(dir.path().join("common.resource"), "*** Keywords ***\n").unwrap();
        fs::write(dir.path().join("readme.md"), "not robot").unwrap();

        let files = DefaultFileDiscovery.discover_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn classify_change_routes_by_extension() {
        assert_eq!(classify_change(Path::new("a.resource")), ImportChangeKind::Resource);
        assert_eq!(classify_change(Path::new("a.py")), ImportChangeKind::Library);
        assert_eq!(classify_change(Path::new("a.yaml")), ImportChangeKind::Variables);
    }

    #[tokio::test]
    async fn file_watcher_can_be_created() {
        let dir = tempdir().unwrap();
        let watcher = FileWatcher::new(dir.path());
        assert!(watcher.is_ok());
        assert!(!watcher.unwrap().has_pending_events());
    }
}
