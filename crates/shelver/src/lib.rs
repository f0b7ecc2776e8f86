//! Shelver - Watched-Folder Document Classifier
//!
//! Shelver watches one folder for newly-arrived documents, scores each
//! against several independent signals, optionally gives the user a
//! short veto window, and moves the file into a per-subject folder.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌───────────┐   ┌────────┐
//! │ Notifier │──▶│ Tracker  │──▶│ Stabilize  │──▶│ Classify  │──▶│ Commit │
//! │ (notify) │   │ (dedup)  │   │ (delay +   │   │ (filename │   │ (move+ │
//! │          │   │          │   │  probe)    │   │  device   │   │  audit)│
//! └──────────┘   └──────────┘   └────────────┘   │  content) │   └────────┘
//!                                                └─────┬─────┘        ▲
//!                                                      ▼              │
//!                                                ┌───────────┐  veto/accept
//!                                                │ Confirm   │────────┘
//!                                                │ (5s veto) │
//!                                                └───────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Subject**: the destination category a document is filed under
//! - **Signal**: one piece of evidence (filename, origin device, content)
//! - **Veto**: a user action within the confirmation window that keeps
//!   the file where it is

pub mod audit;
pub mod classify;
pub mod commit;
pub mod config;
pub mod confirm;
pub mod device;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod stabilize;
pub mod tracker;
pub mod watcher;

// Re-exports for convenience
pub use audit::{AuditRecord, AuditSink, FileAuditLog, MemoryAuditLog};
pub use classify::{Classifier, Decision, Evidence, ScoringMode, Signal};
pub use commit::{CommitEngine, CommitOutcome, CommitResult};
pub use config::{ConfirmConfig, ShelverConfig};
pub use confirm::{ConfirmationRouter, Verdict};
pub use device::{MountLabeler, StaticLabels, VolumeLabeler};
pub use error::{Result, ShelverError};
pub use extract::{ContentExtractor, DocFormat, OfficeExtractor};
pub use model::{SubjectModel, TokenWeightModel};
pub use pipeline::{Pipeline, RunOutcome};
pub use prompt::{LogPrompter, Prompter};
pub use stabilize::{await_stable, Stability};
pub use tracker::InFlightTracker;
pub use watcher::{spawn_dispatcher, watch_directory, ExtensionFilter, WatchEvent, WatcherHandle};
