//! Dedup/debounce tracking of in-flight paths
//!
//! Filesystem notifiers can fire several events for a single logical
//! arrival (create plus write-growth). Admission through this tracker is
//! the only thing that prevents the same file being classified and moved
//! twice concurrently.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Process-wide set of paths currently owned by a pipeline run.
///
/// Clone is cheap and shares state. The lock is held only for the
/// membership operation, never across an await point.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically test-and-insert. Returns false if the path is already
    /// in flight, in which case the caller must not start a run.
    pub fn admit(&self, path: &Path) -> bool {
        let mut paths = self.paths.lock().expect("in-flight lock poisoned");
        paths.insert(path.to_path_buf())
    }

    /// Remove a path so a later arrival event can be retried.
    pub fn release(&self, path: &Path) {
        let mut paths = self.paths.lock().expect("in-flight lock poisoned");
        paths.remove(path);
    }

    /// Number of paths currently in flight or retired.
    pub fn len(&self) -> usize {
        self.paths.lock().expect("in-flight lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
