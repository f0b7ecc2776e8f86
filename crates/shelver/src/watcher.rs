//! Watch dispatcher
//!
//! Consumes creation events (from the OS notifier in production, or an
//! injected channel in tests), filters out directories and disallowed
//! extensions, admits each path through the in-flight tracker and spawns
//! one independent pipeline run per admitted path. The dispatcher never
//! blocks on a run's completion.

use crate::error::Result;
use crate::pipeline::Pipeline;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A creation event from the notifier.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// How a shutdown request treats in-flight runs.
enum Shutdown {
    /// Stop accepting events; leave in-flight runs to finish detached.
    Immediate,
    /// Stop accepting events and await every in-flight run.
    Drain,
}

/// Handle for controlling a running dispatcher.
pub struct WatcherHandle {
    shutdown_tx: mpsc::Sender<Shutdown>,
    join_handle: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop accepting new events. In-flight runs keep going detached.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(Shutdown::Immediate).await;
        self.join_handle
            .await
            .map_err(|e| crate::error::ShelverError::InvalidState(e.to_string()))
    }

    /// Stop accepting new events and wait for in-flight runs to finish.
    pub async fn shutdown_and_drain(self) -> Result<()> {
        let _ = self.shutdown_tx.send(Shutdown::Drain).await;
        self.join_handle
            .await
            .map_err(|e| crate::error::ShelverError::InvalidState(e.to_string()))
    }
}

/// Extension allow-list filter shared by dispatcher and bridge.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Extensions are stored lowercased with their leading dot.
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn allows(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_lowercase());
        self.extensions.contains(&dotted)
    }
}

/// Spawn the dispatcher task over an event stream.
pub fn spawn_dispatcher(
    pipeline: Arc<Pipeline>,
    filter: ExtensionFilter,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
) -> WatcherHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    let join_handle = tokio::spawn(async move {
        let mut runs: Vec<JoinHandle<()>> = Vec::new();

        loop {
            // Biased toward events so a shutdown request never races
            // ahead of arrivals already queued behind it.
            tokio::select! {
                biased;
                event = events.recv() => {
                    let Some(event) = event else {
                        // Notifier went away; nothing more will arrive.
                        drain_runs(&mut runs).await;
                        break;
                    };
                    runs.retain(|run| !run.is_finished());

                    if event.is_dir {
                        continue;
                    }
                    if !filter.allows(&event.path) {
                        debug!(path = %event.path.display(), "extension not in allow-list");
                        continue;
                    }
                    if !pipeline.tracker().admit(&event.path) {
                        info!(path = %event.path.display(), "duplicate event; already in flight");
                        continue;
                    }

                    let pipeline = Arc::clone(&pipeline);
                    runs.push(tokio::spawn(async move {
                        let outcome = pipeline.run(event.path).await;
                        debug!(?outcome, "pipeline run finished");
                    }));
                }
                mode = shutdown_rx.recv() => {
                    if matches!(mode, Some(Shutdown::Drain)) {
                        info!(in_flight = runs.len(), "draining in-flight runs");
                        drain_runs(&mut runs).await;
                    }
                    break;
                }
            }
        }
        info!("dispatcher stopped");
    });

    WatcherHandle {
        shutdown_tx,
        join_handle,
    }
}

async fn drain_runs(runs: &mut Vec<JoinHandle<()>>) {
    for run in runs.drain(..) {
        if let Err(err) = run.await {
            warn!(error = %err, "pipeline run panicked");
        }
    }
}

/// Bridge OS creation events for one directory (non-recursive) into the
/// dispatcher's channel. The returned watcher must be kept alive for as
/// long as events are wanted.
pub fn watch_directory(
    dir: &Path,
    tx: mpsc::UnboundedSender<WatchEvent>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_)) {
                    return;
                }
                for path in event.paths {
                    let is_dir = path.is_dir();
                    let _ = tx.send(WatchEvent { path, is_dir });
                }
            }
            Err(err) => warn!(error = %err, "notifier error"),
        },
        notify::Config::default(),
    )?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    info!(dir = %dir.display(), "watching for new files");
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::classify::{Classifier, ScoringMode};
    use crate::commit::CommitEngine;
    use crate::device::StaticLabels;
    use crate::extract::OfficeExtractor;
    use crate::model::SubjectModel;
    use crate::prompt::LogPrompter;
    use crate::tracker::InFlightTracker;
    use std::collections::BTreeMap;
    use std::time::Duration;

    struct NoModel;

    impl SubjectModel for NoModel {
        fn predict(&self, _text: &str) -> Option<String> {
            None
        }
    }

    fn test_pipeline(dest_root: &Path, audit: MemoryAuditLog) -> Arc<Pipeline> {
        let mut keywords = BTreeMap::new();
        keywords.insert("数学".to_string(), vec!["函数".to_string()]);
        let classifier = Classifier::new(
            keywords,
            BTreeMap::new(),
            ScoringMode::FilenameFirst,
            Arc::new(OfficeExtractor),
            Arc::new(NoModel),
            Arc::new(StaticLabels::default()),
        );
        Arc::new(Pipeline::new(
            Duration::from_millis(5),
            InFlightTracker::new(),
            Arc::new(classifier),
            None,
            CommitEngine::new(dest_root.to_path_buf()),
            Arc::new(audit),
            Arc::new(LogPrompter),
        ))
    }

    fn filter() -> ExtensionFilter {
        ExtensionFilter::new(&[".txt".to_string(), ".docx".to_string()])
    }

    #[test]
    fn test_extension_filter() {
        let filter = filter();
        assert!(filter.allows(Path::new("/in/a.txt")));
        assert!(filter.allows(Path::new("/in/A.TXT")));
        assert!(!filter.allows(Path::new("/in/a.mp4")));
        assert!(!filter.allows(Path::new("/in/noext")));
    }

    #[tokio::test]
    async fn test_duplicate_events_processed_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("函数练习.txt");
        std::fs::write(&source, "1+1").unwrap();

        let audit = MemoryAuditLog::new();
        let pipeline = test_pipeline(dir.path(), audit.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_dispatcher(Arc::clone(&pipeline), filter(), rx);

        // Rapid duplicate events for one logical arrival.
        for _ in 0..3 {
            tx.send(WatchEvent {
                path: source.clone(),
                is_dir: false,
            })
            .unwrap();
        }
        drop(tx);

        handle.shutdown_and_drain().await.unwrap();
        assert_eq!(audit.lines().len(), 1);
        assert!(dir.path().join("数学").join("函数练习.txt").is_file());
    }

    #[tokio::test]
    async fn test_directories_and_foreign_extensions_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let subdir = dir.path().join("函数资料");
        std::fs::create_dir_all(&subdir).unwrap();
        let clip = dir.path().join("函数讲解.mp4");
        std::fs::write(&clip, "").unwrap();

        let audit = MemoryAuditLog::new();
        let pipeline = test_pipeline(dir.path(), audit.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_dispatcher(Arc::clone(&pipeline), filter(), rx);

        tx.send(WatchEvent {
            path: subdir.clone(),
            is_dir: true,
        })
        .unwrap();
        tx.send(WatchEvent {
            path: clip.clone(),
            is_dir: false,
        })
        .unwrap();
        drop(tx);

        handle.shutdown_and_drain().await.unwrap();
        assert!(audit.lines().is_empty());
        assert!(pipeline.tracker().is_empty());
        assert!(subdir.is_dir());
        assert!(clip.is_file());
    }

    #[tokio::test]
    async fn test_drain_waits_for_runs() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("函数作业.txt");
        std::fs::write(&source, "x").unwrap();

        let audit = MemoryAuditLog::new();
        let pipeline = test_pipeline(dir.path(), audit.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_dispatcher(pipeline, filter(), rx);

        tx.send(WatchEvent {
            path: source.clone(),
            is_dir: false,
        })
        .unwrap();
        // Give the dispatcher a beat to admit and spawn the run.
        tokio::time::sleep(Duration::from_millis(2)).await;

        handle.shutdown_and_drain().await.unwrap();
        // After drain the run is fully finished, not merely started.
        assert_eq!(audit.lines().len(), 1);
        assert!(!source.exists());
    }
}
