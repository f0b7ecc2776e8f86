//! Origin-device volume labels
//!
//! A document arriving straight from a labeled USB stick is strong
//! evidence of its subject. On Linux the desktop automounter exposes the
//! label as the mount point's last component (`/media/<user>/<LABEL>` or
//! `/run/media/<user>/<LABEL>`), which is what we read here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolves the removable-volume label a path lives on, if any.
pub trait VolumeLabeler: Send + Sync {
    fn label_for(&self, path: &Path) -> Option<String>;
}

/// Labeler for automounted removable media.
#[derive(Debug, Clone)]
pub struct MountLabeler {
    media_roots: Vec<PathBuf>,
}

impl Default for MountLabeler {
    fn default() -> Self {
        Self {
            media_roots: vec![PathBuf::from("/media"), PathBuf::from("/run/media")],
        }
    }
}

impl MountLabeler {
    pub fn with_roots(media_roots: Vec<PathBuf>) -> Self {
        Self { media_roots }
    }
}

impl VolumeLabeler for MountLabeler {
    fn label_for(&self, path: &Path) -> Option<String> {
        for root in &self.media_roots {
            let Ok(rest) = path.strip_prefix(root) else {
                continue;
            };
            // Mount layout is <root>/<user>/<LABEL>/...; the component
            // after the user directory is the volume label.
            let mut components = rest.components();
            let _user = components.next()?;
            let label = components.next()?;
            return Some(label.as_os_str().to_string_lossy().into_owned());
        }
        None
    }
}

/// Fixed path-prefix -> label mapping, for tests and deployments where
/// removable media are mounted at known locations.
#[derive(Debug, Clone, Default)]
pub struct StaticLabels {
    prefixes: BTreeMap<PathBuf, String>,
}

impl StaticLabels {
    pub fn new(prefixes: BTreeMap<PathBuf, String>) -> Self {
        Self { prefixes }
    }
}

impl VolumeLabeler for StaticLabels {
    fn label_for(&self, path: &Path) -> Option<String> {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.components().count())
            .map(|(_, label)| label.clone())
    }
}
