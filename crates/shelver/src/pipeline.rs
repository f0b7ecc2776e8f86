//! One pipeline run per admitted file
//!
//! Owns the control flow from "observed" to a terminal outcome:
//! stabilization gate -> scoring -> optional confirmation -> commit,
//! plus the tracker release/retire policy. Terminal decisions
//! (committed, unclassifiable) retire the path so late duplicate events
//! for the same arrival stay suppressed; everything else releases it so
//! a fresh arrival event can retry.

use crate::audit::{AuditRecord, AuditSink};
use crate::classify::Classifier;
use crate::commit::{CommitEngine, CommitOutcome, CommitResult};
use crate::confirm::ConfirmationRouter;
use crate::prompt::Prompter;
use crate::stabilize::{await_stable, Stability};
use crate::tracker::InFlightTracker;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Terminal outcome of a single run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// File disappeared during stabilization; arrival abandoned.
    Vanished,
    /// File unreadable after the delay; most likely still copying.
    Locked,
    /// No unique positive score; the file stays put.
    Unclassifiable,
    /// The commit stage ran (committed, rolled back, or failed).
    Commit(CommitResult),
}

/// Everything a run needs, shared across all spawned tasks.
pub struct Pipeline {
    delay: Duration,
    tracker: InFlightTracker,
    classifier: Arc<Classifier>,
    confirmation: Option<ConfirmationRouter>,
    commit: CommitEngine,
    audit: Arc<dyn AuditSink>,
    prompter: Arc<dyn Prompter>,
}

impl Pipeline {
    pub fn new(
        delay: Duration,
        tracker: InFlightTracker,
        classifier: Arc<Classifier>,
        confirmation: Option<ConfirmationRouter>,
        commit: CommitEngine,
        audit: Arc<dyn AuditSink>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            delay,
            tracker,
            classifier,
            confirmation,
            commit,
            audit,
            prompter,
        }
    }

    pub fn tracker(&self) -> &InFlightTracker {
        &self.tracker
    }

    pub fn confirmation(&self) -> Option<&ConfirmationRouter> {
        self.confirmation.as_ref()
    }

    /// Process one admitted path to a terminal outcome. The caller must
    /// have won `tracker.admit` for this path.
    pub async fn run(&self, path: PathBuf) -> RunOutcome {
        match await_stable(&path, self.delay).await {
            Stability::Ready => {}
            Stability::Vanished => {
                info!(path = %path.display(), "file vanished before stabilization");
                self.tracker.release(&path);
                return RunOutcome::Vanished;
            }
            Stability::Locked => {
                info!(path = %path.display(), "file still locked; abandoning this run");
                self.tracker.release(&path);
                return RunOutcome::Locked;
            }
        }

        // Extraction and model prediction are file-bound work; keep them
        // off the async workers.
        let decision = {
            let classifier = Arc::clone(&self.classifier);
            let task_path = path.clone();
            match tokio::task::spawn_blocking(move || classifier.classify(&task_path)).await {
                Ok(decision) => decision,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "classification task failed");
                    self.tracker.release(&path);
                    return RunOutcome::Unclassifiable;
                }
            }
        };

        let Some(subject) = decision.subject.clone() else {
            info!(path = %path.display(), "no unique winner; leaving file in place");
            self.prompter.notify_unclassifiable(&path);
            // Terminal decision: stays marked to suppress duplicates.
            return RunOutcome::Unclassifiable;
        };

        if let Some(router) = &self.confirmation {
            let verdict = router.await_verdict(&path, &subject).await;
            if !verdict.approves() {
                info!(path = %path.display(), subject, "vetoed; file stays at its original location");
                let result = CommitResult::rolled_back(&path);
                self.append_audit(&result, &decision.evidence, Some(subject.as_str()));
                self.tracker.release(&path);
                return RunOutcome::Commit(result);
            }
        }

        let result = self.commit.commit(&path, &subject);
        self.append_audit(&result, &decision.evidence, Some(subject.as_str()));
        if !matches!(result.outcome, CommitOutcome::Committed) {
            // Move failures release the path; a re-drop retries.
            self.tracker.release(&path);
        }
        RunOutcome::Commit(result)
    }

    fn append_audit(
        &self,
        result: &CommitResult,
        evidence: &[crate::classify::Evidence],
        subject: Option<&str>,
    ) {
        let label = result.outcome.label();
        let record = AuditRecord {
            path: &result.path,
            subject,
            outcome: &label,
            evidence,
        };
        if let Err(err) = self.audit.append(&record) {
            warn!(error = %err, "failed to append audit record");
        }
    }
}
