//! Commit engine
//!
//! Performs the destination move for an approved decision. Collisions
//! are refused, never silently overwritten, and the move is verified
//! before the original path is considered vacated: the file must not end
//! up half-moved from the caller's perspective.

use crate::error::{Result, ShelverError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Terminal outcome of one pipeline run's commit stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Moved into the destination folder.
    Committed,
    /// Vetoed; the file stays at its original location.
    RolledBack,
    /// The move could not be performed; the file stays at the source.
    Failed(String),
}

impl CommitOutcome {
    pub fn label(&self) -> String {
        match self {
            CommitOutcome::Committed => "committed".to_string(),
            CommitOutcome::RolledBack => "rolled_back".to_string(),
            CommitOutcome::Failed(reason) => format!("failed: {reason}"),
        }
    }
}

/// Result of the commit stage, appended to the audit log.
#[derive(Debug, Clone)]
pub struct CommitResult {
    pub path: PathBuf,
    pub destination: Option<PathBuf>,
    pub outcome: CommitOutcome,
}

impl CommitResult {
    pub fn rolled_back(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            destination: None,
            outcome: CommitOutcome::RolledBack,
        }
    }
}

/// Moves approved files under `<dest_root>/<subject>/`.
#[derive(Debug, Clone)]
pub struct CommitEngine {
    dest_root: PathBuf,
}

impl CommitEngine {
    pub fn new(dest_root: PathBuf) -> Self {
        Self { dest_root }
    }

    /// Move `path` into the subject's folder, creating it if needed.
    pub fn commit(&self, path: &Path, subject: &str) -> CommitResult {
        let destination = self.destination_for(path, subject);
        let outcome = match self.perform_move(path, &destination) {
            Ok(()) => {
                info!(path = %path.display(), dest = %destination.display(), "file committed");
                CommitOutcome::Committed
            }
            Err(err) => {
                warn!(path = %path.display(), dest = %destination.display(), error = %err, "move failed");
                CommitOutcome::Failed(err.to_string())
            }
        };
        CommitResult {
            path: path.to_path_buf(),
            destination: Some(destination),
            outcome,
        }
    }

    /// Where `path` would land if committed under `subject`.
    pub fn destination_for(&self, path: &Path, subject: &str) -> PathBuf {
        let name = path.file_name().unwrap_or_default();
        self.dest_root.join(subject).join(name)
    }

    fn perform_move(&self, source: &Path, destination: &Path) -> Result<()> {
        let dest_dir = destination
            .parent()
            .ok_or_else(|| ShelverError::InvalidState("destination has no parent".to_string()))?;
        std::fs::create_dir_all(dest_dir)?;

        if destination.exists() {
            return Err(ShelverError::DestinationCollision(destination.to_path_buf()));
        }

        if let Err(rename_err) = std::fs::rename(source, destination) {
            // Destinations on another filesystem cannot be renamed into;
            // fall back to copy-verify-remove.
            self.copy_then_remove(source, destination)
                .map_err(|copy_err| ShelverError::MoveFailed {
                    path: source.to_path_buf(),
                    reason: format!("rename: {rename_err}; copy fallback: {copy_err}"),
                })?;
        }

        // The original path counts as vacated only once the destination
        // verifiably holds the file.
        if !destination.is_file() {
            return Err(ShelverError::MoveFailed {
                path: source.to_path_buf(),
                reason: "destination missing after move".to_string(),
            });
        }
        Ok(())
    }

    fn copy_then_remove(&self, source: &Path, destination: &Path) -> Result<()> {
        let staged = destination.with_extension("shelver-partial");
        let copied = std::fs::copy(source, &staged)?;
        let expected = std::fs::metadata(source)?.len();
        if copied != expected {
            let _ = std::fs::remove_file(&staged);
            return Err(ShelverError::MoveFailed {
                path: source.to_path_buf(),
                reason: format!("short copy: {copied} of {expected} bytes"),
            });
        }
        std::fs::rename(&staged, destination)?;
        std::fs::remove_file(source)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("函数专题.docx");
        std::fs::write(&source, "body").unwrap();

        let engine = CommitEngine::new(dir.path().to_path_buf());
        let result = engine.commit(&source, "数学");

        assert_eq!(result.outcome, CommitOutcome::Committed);
        let dest = dir.path().join("数学").join("函数专题.docx");
        assert!(dest.is_file());
        assert!(!source.exists());
        assert_eq!(result.destination.unwrap(), dest);
    }

    #[test]
    fn test_collision_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.docx");
        std::fs::write(&source, "new arrival").unwrap();

        let dest_dir = dir.path().join("数学");
        std::fs::create_dir_all(&dest_dir).unwrap();
        std::fs::write(dest_dir.join("a.docx"), "already filed").unwrap();

        let engine = CommitEngine::new(dir.path().to_path_buf());
        let result = engine.commit(&source, "数学");

        assert!(matches!(result.outcome, CommitOutcome::Failed(_)));
        // Neither side is touched.
        assert_eq!(std::fs::read_to_string(&source).unwrap(), "new arrival");
        assert_eq!(
            std::fs::read_to_string(dest_dir.join("a.docx")).unwrap(),
            "already filed"
        );
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = CommitEngine::new(dir.path().to_path_buf());
        let result = engine.commit(&dir.path().join("ghost.docx"), "数学");
        assert!(matches!(result.outcome, CommitOutcome::Failed(_)));
    }

    #[test]
    fn test_destination_dir_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = CommitEngine::new(dir.path().to_path_buf());

        for name in ["a.docx", "b.docx"] {
            let source = dir.path().join(name);
            std::fs::write(&source, "x").unwrap();
            let result = engine.commit(&source, "英语");
            assert_eq!(result.outcome, CommitOutcome::Committed);
        }
        assert!(dir.path().join("英语").join("a.docx").is_file());
        assert!(dir.path().join("英语").join("b.docx").is_file());
    }
}
