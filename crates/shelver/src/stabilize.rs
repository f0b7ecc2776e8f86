//! Stabilization gate
//!
//! A newly-created file may still be growing (slow copy from a USB stick
//! or network share). The gate waits out a configurable delay, then makes
//! a single existence-and-openability probe. There is deliberately no
//! retry loop: a failed probe aborts this run, and recovery relies on a
//! later arrival event for the same path.

use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Outcome of the delay-then-probe step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// Present and readable; safe to classify.
    Ready,
    /// Disappeared during the delay; the arrival was abandoned.
    Vanished,
    /// Present but the read probe failed; most likely still copying.
    Locked,
}

/// Wait `delay`, then verify the file is still present and fully written.
pub async fn await_stable(path: &Path, delay: Duration) -> Stability {
    debug!(path = %path.display(), delay_secs = delay.as_secs(), "waiting for file to stabilize");
    tokio::time::sleep(delay).await;

    match tokio::fs::try_exists(path).await {
        Ok(true) => {}
        Ok(false) => return Stability::Vanished,
        Err(_) => return Stability::Vanished,
    }

    // Open-for-read probe; a writer still holding the file exclusively
    // (or a permission problem) shows up here as Locked.
    match tokio::fs::File::open(path).await {
        Ok(_) => Stability::Ready,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "stability probe failed");
            Stability::Locked
        }
    }
}
