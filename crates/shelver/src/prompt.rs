//! User-facing prompt surface
//!
//! The confirmation protocol only needs a fire-and-forget way to tell the
//! user "this file is about to be filed under X". Vetoes come back
//! through [`crate::confirm::ConfirmationRouter::veto`], not through the
//! prompter.

use crate::error::Result;
use std::path::Path;

/// Surfaces a proposed decision to the user. Failures here must never
/// stall the pipeline; the caller treats them as implicit approval.
pub trait Prompter: Send + Sync {
    fn prompt(&self, subject: &str, path: &Path) -> Result<()>;

    /// Tell the user a file could not be classified and was left alone.
    fn notify_unclassifiable(&self, path: &Path) {
        tracing::info!(path = %path.display(), "unclassifiable; file left in watch folder");
    }
}

/// Prompter that writes the question to the service log. Deployments
/// with a desktop-notification frontend supply their own impl.
#[derive(Debug, Default)]
pub struct LogPrompter;

impl Prompter for LogPrompter {
    fn prompt(&self, subject: &str, path: &Path) -> Result<()> {
        tracing::info!(
            subject,
            path = %path.display(),
            "proposed classification; veto within the window to keep the file in place"
        );
        Ok(())
    }
}
