//! Audit log of terminal commit outcomes
//!
//! One human-readable timestamped line per terminal outcome: source
//! path, resolved subject, outcome, and the scoring evidence that led
//! there. Append-only; diagnosability is the whole point.

use crate::classify::Evidence;
use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One terminal outcome ready to be recorded.
pub struct AuditRecord<'a> {
    pub path: &'a Path,
    pub subject: Option<&'a str>,
    pub outcome: &'a str,
    pub evidence: &'a [Evidence],
}

impl AuditRecord<'_> {
    fn to_line(&self) -> String {
        let evidence = self
            .evidence
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{}  {}  subject={}  outcome={}  evidence=[{}]",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.path.display(),
            self.subject.unwrap_or("-"),
            self.outcome,
            evidence
        )
    }
}

/// Append-only audit sink.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord<'_>) -> Result<()>;
}

/// File-backed audit log, one line per record.
pub struct FileAuditLog {
    file: Mutex<File>,
}

impl FileAuditLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, record: &AuditRecord<'_>) -> Result<()> {
        let mut file = self.file.lock().expect("audit lock poisoned");
        writeln!(file, "{}", record.to_line())?;
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Clone, Default)]
pub struct MemoryAuditLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("audit lock poisoned").clone()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, record: &AuditRecord<'_>) -> Result<()> {
        self.lines
            .lock()
            .expect("audit lock poisoned")
            .push(record.to_line());
        Ok(())
    }
}

/// Default audit log location under the shelver home.
pub fn default_audit_path() -> PathBuf {
    shelver_logging::shelver_home().join("audit.log")
}
