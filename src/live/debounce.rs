//! Event classification and debouncing.
//!
//! A single shared deadline is re-armed by every event. When it passes with
//! no newer event, one message describing the last event is emitted; earlier
//! file names in the same burst are dropped.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use notify::event::{EventKind, ModifyKind};
use tokio::time::Instant;

/// Kind of change reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
}

impl ChangeKind {
    /// Classify a raw notify event. Access events are not changes.
    ///
    /// Checked in order: created, removed, renamed, else modified.
    pub fn classify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Remove(_) => Some(ChangeKind::Removed),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
            _ => Some(ChangeKind::Modified),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
            ChangeKind::Renamed => "renamed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
struct Pending {
    message: String,
    deadline: Instant,
}

/// Coalesces bursts of change events into one message.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Record an event, replacing any pending one and re-arming the deadline.
    pub fn record(&mut self, path: &Path, kind: ChangeKind, now: Instant) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.pending = Some(Pending {
            message: format!("{name} {kind}"),
            deadline: now + self.window,
        });
    }

    /// When the pending message is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Take the pending message if its deadline has passed.
    pub fn take_ready(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(p) if p.deadline <= now => self.pending.take().map(|p| p.message),
            _ => None,
        }
    }
}
