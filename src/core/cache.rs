//! Process-wide cache of loaded duplicate indexes
//!
//! Keyed by project root. Nothing expires on its own; long-lived callers that
//! must observe a rebuilt index call [`IndexCache::invalidate`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::index::store::{open_index, VectorIndex};

/// Result of loading a project's index
#[derive(Debug)]
pub enum LoadedIndex {
    /// No index, or an unreadable one; every query is a no-op
    Missing,
    Ready(VectorIndex),
}

impl LoadedIndex {
    pub fn index(&self) -> Option<&VectorIndex> {
        match self {
            LoadedIndex::Ready(index) => Some(index),
            LoadedIndex::Missing => None,
        }
    }
}

/// Cache manager
pub struct IndexCache {
    index_dir: PathBuf,
    entries: Mutex<HashMap<PathBuf, Arc<LoadedIndex>>>,
}

impl IndexCache {
    /// `index_dir` is resolved against each project root
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn index_dir_for(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.index_dir)
    }

    /// Return the cached index for `project_root`, loading it on first use
    pub fn get_or_load(&self, project_root: &Path) -> Arc<LoadedIndex> {
        let mut entries = self.lock();
        if let Some(loaded) = entries.get(project_root) {
            return Arc::clone(loaded);
        }

        let dir = self.index_dir_for(project_root);
        let loaded = match open_index(&dir) {
            Some(index) => {
                debug!(
                    "Loaded duplicate index for {} ({} vectors)",
                    project_root.display(),
                    index.len()
                );
                LoadedIndex::Ready(index)
            }
            None => LoadedIndex::Missing,
        };

        let loaded = Arc::new(loaded);
        entries.insert(project_root.to_path_buf(), Arc::clone(&loaded));
        loaded
    }

    /// Drop the cached index of one project
    pub fn invalidate(&self, project_root: &Path) {
        self.lock().remove(project_root);
    }

    /// Clear all cache
    pub fn invalidate_all(&self) {
        self.lock().clear();
    }

    pub fn is_cached(&self, project_root: &Path) -> bool {
        self.lock().contains_key(project_root)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<LoadedIndex>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(crate::index::DEFAULT_INDEX_DIR)
    }
}
