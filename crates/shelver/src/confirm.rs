//! Human confirmation protocol
//!
//! After a decision, the pipeline may give the user a short window to
//! veto the move: `Decided -> AwaitingFeedback -> {Confirmed, Vetoed,
//! TimedOut}`. Silence means approval; a missing or broken prompt
//! surface also means approval, because a file stuck in the watch folder
//! costs more than a misfiled one the user can still veto next time.
//!
//! Vetoes travel over an in-process oneshot channel per pending path.

use crate::prompt::Prompter;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{info, warn};

/// Terminal states of the confirmation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Explicit approval (currently only via prompt-failure fallback).
    Confirmed,
    /// The user vetoed within the window; the file stays put.
    Vetoed,
    /// The window expired with no veto; treated as approval.
    TimedOut,
}

impl Verdict {
    /// Whether the commit may proceed.
    pub fn approves(self) -> bool {
        matches!(self, Verdict::Confirmed | Verdict::TimedOut)
    }
}

struct Pending {
    subject: String,
    deadline: Instant,
    veto_tx: oneshot::Sender<()>,
}

/// Shared router between waiting pipeline runs and whatever frontend
/// delivers vetoes. Clone is cheap and shares state.
#[derive(Clone)]
pub struct ConfirmationRouter {
    window: Duration,
    prompter: Arc<dyn Prompter>,
    pending: Arc<Mutex<HashMap<PathBuf, Pending>>>,
}

impl ConfirmationRouter {
    pub fn new(window: Duration, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            window,
            prompter,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Surface the decision and wait out the veto window.
    pub async fn await_verdict(&self, path: &Path, subject: &str) -> Verdict {
        if let Err(err) = self.prompter.prompt(subject, path) {
            // Pipeline availability beats soliciting feedback.
            warn!(path = %path.display(), error = %err, "prompt failed; committing without confirmation");
            return Verdict::Confirmed;
        }

        let (veto_tx, veto_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.insert(
                path.to_path_buf(),
                Pending {
                    subject: subject.to_string(),
                    deadline: Instant::now() + self.window,
                    veto_tx,
                },
            );
        }

        let verdict = match tokio::time::timeout(self.window, veto_rx).await {
            Ok(Ok(())) => Verdict::Vetoed,
            // Sender dropped without firing; nobody can veto anymore.
            Ok(Err(_)) => Verdict::TimedOut,
            Err(_) => Verdict::TimedOut,
        };

        self.pending
            .lock()
            .expect("pending lock poisoned")
            .remove(path);

        info!(path = %path.display(), subject, ?verdict, "confirmation window closed");
        verdict
    }

    /// Deliver a veto for a pending path. Returns false when the path is
    /// not awaiting feedback (already resolved or never prompted).
    pub fn veto(&self, path: &Path) -> bool {
        let entry = {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.remove(path)
        };
        match entry {
            Some(p) => p.veto_tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Paths currently awaiting feedback, with subject and deadline.
    pub fn pending(&self) -> Vec<(PathBuf, String, Instant)> {
        let pending = self.pending.lock().expect("pending lock poisoned");
        pending
            .iter()
            .map(|(path, p)| (path.clone(), p.subject.clone(), p.deadline))
            .collect()
    }
}
