//! Imports manager (§4.3): wraps the LibraryDoc provider with path
//! resolution so namespace building never has to know how a `Resource`/
//! `Library`/`Variables` setting turns into an absolute path.

use crate::cache::Sentinel;
use crate::error::RobotCodeError;
use crate::semantic::entities::LibraryDoc;
use crate::semantic::library_doc::{LibDocKind, LibraryDocProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// What kind of setting is being resolved to a path (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Library,
    Resource,
    Variables,
}

/// Resolves imports to absolute paths and delegates loading to the
/// [`LibraryDocProvider`]. Owns the provider so the cache is genuinely
/// process-wide-but-explicit (§9 "Global library cache") rather than a
/// hidden singleton — tests construct their own `ImportsManager`.
pub struct ImportsManager {
    provider: Arc<LibraryDocProvider>,
    search_path: Vec<PathBuf>,
}

impl ImportsManager {
    pub fn new(provider: Arc<LibraryDocProvider>, search_path: Vec<PathBuf>) -> Self {
        Self { provider, search_path }
    }

    pub fn provider(&self) -> &Arc<LibraryDocProvider> {
        &self.provider
    }

    /// `find_file(name, base_dir, kind)` (§4.3): resource/variables imports
    /// search `base_dir` first, then the configured search path; library
    /// imports are resolved by name through the provider and only fall
    /// back to path lookup when that fails, so this returns `None` for
    /// `ImportKind::Library` and callers skip straight to
    /// `get_libdoc_for_library_import`.
    pub fn find_file(&self, name: &str, base_dir: &Path, kind: ImportKind) -> Option<PathBuf> {
        if matches!(kind, ImportKind::Library) {
            return None;
        }
        let candidate = base_dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        for dir in &self.search_path {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    pub fn get_libdoc_for_library_import(
        &self,
        name: &str,
        args: &[String],
        base_dir: &Path,
        sentinel: Sentinel,
    ) -> Result<Arc<LibraryDoc>, RobotCodeError> {
        // Module-style resolution: the provider's loader chain matches by
        // name directly. When nothing recognizes the name, fall back to
        // treating it as a path relative to `base_dir` (a user-authored
        // library module file) before giving up.
        let builtin_path = PathBuf::from(name);
        let doc = self.provider.get_libdoc(LibDocKind::Library, &builtin_path, args, sentinel);
        if doc.errors.is_empty() {
            return Ok(doc);
        }
        if let Some(path) = self.find_file(name, base_dir, ImportKind::Resource) {
            return Ok(self.provider.get_libdoc(LibDocKind::Library, &path, args, sentinel));
        }
        Ok(doc)
    }

    pub fn get_libdoc_for_resource_import(
        &self,
        name: &str,
        base_dir: &Path,
        sentinel: Sentinel,
    ) -> Result<Arc<LibraryDoc>, RobotCodeError> {
        let path = self
            .find_file(name, base_dir, ImportKind::Resource)
            .ok_or_else(|| RobotCodeError::import(format!("Resource file '{name}' does not exist.")))?;
        Ok(self.provider.get_libdoc(LibDocKind::Resource, &path, &[], sentinel))
    }

    pub fn get_libdoc_for_variables_import(
        &self,
        name: &str,
        args: &[String],
        base_dir: &Path,
        sentinel: Sentinel,
    ) -> Result<Arc<LibraryDoc>, RobotCodeError> {
        let path = self
            .find_file(name, base_dir, ImportKind::Variables)
            .ok_or_else(|| RobotCodeError::import(format!("Variables file '{name}' does not exist.")))?;
        Ok(self.provider.get_libdoc(LibDocKind::Variables, &path, args, sentinel))
    }

    /// Resolves the absolute path a resource import would load, without
    /// loading it — used by the namespace builder to build a child
    /// `Namespace` for recursion (§4.3, §4.4.1).
    pub fn resolve_resource_path(&self, name: &str, base_dir: &Path) -> Option<PathBuf> {
        self.find_file(name, base_dir, ImportKind::Resource)
            .map(|p| p.canonicalize().unwrap_or(p))
    }

    pub fn invalidate_library(&self, source: &Path) {
        self.provider.invalidate(source);
    }

    pub fn libraries_changed(&self) -> broadcast::Receiver<crate::semantic::library_doc::LibDocKey> {
        self.provider.subscribe()
    }

    pub fn resources_changed(&self) -> broadcast::Receiver<crate::semantic::library_doc::LibDocKey> {
        self.provider.subscribe()
    }

    pub fn variables_changed(&self) -> broadcast::Receiver<crate::semantic::library_doc::LibDocKey> {
        self.provider.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LineParser;
    use std::io::Write;

    fn manager(search_path: Vec<PathBuf>) -> ImportsManager {
        let provider = Arc::new(LibraryDocProvider::with_stdlib(Arc::new(LineParser::new())));
        ImportsManager::new(provider, search_path)
    }

    #[test]
    fn find_file_checks_base_dir_before_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("common.resource");
        std::fs::write(&file_path, "*** Keywords ***\n").unwrap();

        let mgr = manager(vec![]);
        let found = mgr.find_file("common.resource", dir.path(), ImportKind::Resource);
        assert_eq!(found, Some(file_path));
    }

    #[test]
    fn find_file_falls_back_to_search_path() {
        let base = tempfile::tempdir().unwrap();
        let search_dir = tempfile::tempdir().unwrap();
        let file_path = search_dir.path().join("shared.resource");
        std::fs::write(&file_path, "*** Keywords ***\n").unwrap();

        let mgr = manager(vec![search_dir.path().to_path_buf()]);
        let found = mgr.find_file("shared.resource", base.path(), ImportKind::Resource);
        assert_eq!(found, Some(file_path));
    }

    #[test]
    fn get_libdoc_for_resource_import_errors_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(vec![]);
        let sentinel = crate::cache::SentinelRegistry::default().next();
        let result = mgr.get_libdoc_for_resource_import("missing.resource", dir.path(), sentinel);
        assert!(result.is_err());
    }

    #[test]
    fn get_libdoc_for_resource_import_loads_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("common.resource");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "*** Keywords ***\nNoop\n    No Operation\n").unwrap();

        let mgr = manager(vec![]);
        let sentinel = crate::cache::SentinelRegistry::default().next();
        let doc = mgr
            .get_libdoc_for_resource_import("common.resource", dir.path(), sentinel)
            .unwrap();
        assert!(doc.find_keyword("noop").is_some());
    }
}
