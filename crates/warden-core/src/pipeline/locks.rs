//! Per-path advisory locks for in-flight invocations.
//!
//! At most one invocation may hold the lock for a given target path at any
//! time. Locks are process-local and advisory only; release is tied to
//! guard drop so every pipeline exit path, success or failure, lets the
//! path go.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Registry of paths currently claimed by in-flight invocations.
#[derive(Debug, Clone, Default)]
pub struct PathLockRegistry {
    held: Arc<Mutex<HashSet<PathBuf>>>,
}

impl PathLockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to claim `path`; returns `None` if another invocation
    /// already holds it.
    #[must_use]
    pub fn try_claim(&self, path: &Path) -> Option<PathLockGuard> {
        let mut held = self
            .held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if held.contains(path) {
            return None;
        }
        held.insert(path.to_path_buf());
        Some(PathLockGuard {
            path: path.to_path_buf(),
            held: Arc::clone(&self.held),
        })
    }

    /// Returns true if `path` is currently claimed.
    #[must_use]
    pub fn is_held(&self, path: &Path) -> bool {
        self.held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(path)
    }
}

/// RAII claim on a path; releases on drop.
#[derive(Debug)]
pub struct PathLockGuard {
    path: PathBuf,
    held: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&self.path);
    }
}
