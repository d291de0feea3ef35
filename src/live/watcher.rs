//! Recursive filesystem watcher feeding the change hub.
//!
//! # Responsibilities
//! - Register a watch on every directory under the serving root
//! - Extend the watch set when directories are created later
//! - Debounce raw events and broadcast one coalesced message
//!
//! # Design Decisions
//! - Directories are watched individually (non-recursive) so the watch set
//!   is explicit and grows reactively
//! - Startup walk failures abort the watcher; the server keeps running
//! - Event-level errors are logged and never end the loop

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use walkdir::WalkDir;

use crate::live::debounce::{ChangeKind, Debouncer};
use crate::live::hub::ChangeHub;

/// Errors from watcher setup.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {0}")]
    Init(#[from] notify::Error),

    #[error("Cannot resolve watch root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },
}

/// Register a non-recursive watch on `dir` and every directory below it.
///
/// Returns the number of directories registered.
pub fn watch_tree<W: Watcher>(watcher: &mut W, dir: &Path) -> Result<usize, WatchError> {
    let mut registered = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| WatchError::Walk {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        watcher
            .watch(entry.path(), RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %entry.path().display(), "Watching directory");
        registered += 1;
    }
    Ok(registered)
}

/// Watches the serving root and broadcasts coalesced change messages.
pub struct FileWatcher {
    root: PathBuf,
    hub: ChangeHub,
    debounce: Duration,
}

impl FileWatcher {
    pub fn new(root: impl Into<PathBuf>, hub: ChangeHub, debounce: Duration) -> Self {
        Self {
            root: root.into(),
            hub,
            debounce,
        }
    }

    /// Register the initial watch set and spawn the event loop.
    ///
    /// The loop ends on `shutdown` or when the event channel closes.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> Result<JoinHandle<()>, WatchError> {
        let root = self.root.canonicalize().map_err(|source| WatchError::Root {
            path: self.root.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        let directories = watch_tree(&mut watcher, &root)?;
        tracing::info!(
            root = %root.display(),
            directories,
            debounce_ms = self.debounce.as_millis() as u64,
            "File watcher started"
        );

        let watch_loop = WatchLoop {
            events: rx,
            watcher: Some(watcher),
            hub: self.hub,
            debouncer: Debouncer::new(self.debounce),
        };
        Ok(tokio::spawn(watch_loop.run(shutdown)))
    }
}

/// The event loop, separated from OS registration so it can be driven directly.
pub(crate) struct WatchLoop {
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    watcher: Option<RecommendedWatcher>,
    hub: ChangeHub,
    debouncer: Debouncer,
}

impl WatchLoop {
    #[cfg(test)]
    pub(crate) fn detached(
        events: mpsc::UnboundedReceiver<notify::Result<Event>>,
        hub: ChangeHub,
        debounce: Duration,
    ) -> Self {
        Self {
            events,
            watcher: None,
            hub,
            debouncer: Debouncer::new(debounce),
        }
    }

    pub(crate) async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(Ok(event)) => self.on_event(event),
                    Some(Err(e)) => tracing::warn!(error = %e, "File watcher error"),
                    None => break,
                },
                _ = wait_until(deadline) => {
                    if let Some(message) = self.debouncer.take_ready(Instant::now()) {
                        self.hub.broadcast(&message);
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("File watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
        tracing::debug!("File watcher stopped");
    }

    fn on_event(&mut self, event: Event) {
        if matches!(event.kind, EventKind::Create(_)) {
            self.watch_new_directories(&event.paths);
        }

        let Some(kind) = ChangeKind::classify(&event.kind) else {
            return;
        };
        let Some(path) = event.paths.last() else {
            return;
        };

        tracing::trace!(path = %path.display(), kind = %kind, "File event");
        self.debouncer.record(path, kind, Instant::now());
    }

    fn watch_new_directories(&mut self, paths: &[PathBuf]) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        for path in paths.iter().filter(|p| p.is_dir()) {
            match watch_tree(watcher, path) {
                Ok(count) => {
                    tracing::debug!(path = %path.display(), directories = count, "Watching new directory")
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Error adding new directory to watch")
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
