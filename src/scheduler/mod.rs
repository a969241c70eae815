use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Named delayed actions a process unit can schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatcherKind {
    /// Bring the process back up after a crash or a flapping retry
    Restore,
    /// One-shot liveness probe once the start grace has elapsed
    CheckCrash,
    /// Periodic liveness poll
    CheckAlive,
}

impl WatcherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatcherKind::Restore => "restore",
            WatcherKind::CheckCrash => "check_crash",
            WatcherKind::CheckAlive => "check_alive",
        }
    }
}

impl std::fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification delivered to the owning unit's queue when a watcher fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredWatcher {
    pub kind: WatcherKind,
    pub generation: u64,
}

struct WatcherEntry {
    generation: u64,
    due_at: Instant,
    handle: JoinHandle<()>,
}

/// Per-process registry of named, cancellable delayed actions
///
/// Scheduling a kind that is already pending replaces it: the previous
/// timer task is aborted and its generation retired. A fire notification
/// must be passed through [`Scheduler::acknowledge`] before acting on it;
/// a notification whose generation no longer matches the live entry lost
/// a race with cancellation or replacement and must be dropped.
///
/// The scheduler holds only a weak handle to the queue, so pending
/// timers never keep the owning unit alive.
pub struct Scheduler<T> {
    tx: mpsc::WeakUnboundedSender<T>,
    entries: HashMap<WatcherKind, WatcherEntry>,
    next_generation: u64,
}

impl<T: From<FiredWatcher> + Send + 'static> Scheduler<T> {
    /// Create a scheduler delivering fire notifications to `tx`
    pub fn new(tx: &mpsc::UnboundedSender<T>) -> Self {
        Self {
            tx: tx.downgrade(),
            entries: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Schedule `kind` to fire after `delay`, replacing any pending instance
    pub fn schedule(&mut self, kind: WatcherKind, delay: Duration) {
        self.next_generation += 1;
        let generation = self.next_generation;

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(FiredWatcher { kind, generation }.into());
            }
        });

        let entry = WatcherEntry {
            generation,
            due_at: Instant::now() + delay,
            handle,
        };

        if let Some(old) = self.entries.insert(kind, entry) {
            old.handle.abort();
        }
    }

    /// Cancel a pending watcher; returns whether one was pending
    pub fn cancel(&mut self, kind: WatcherKind) -> bool {
        if let Some(entry) = self.entries.remove(&kind) {
            entry.handle.abort();
            true
        } else {
            false
        }
    }

    /// Cancel every pending watcher
    pub fn cancel_all(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.handle.abort();
        }
    }

    /// Validate a fire notification against the live entries
    ///
    /// Returns true and retires the entry when the notification matches
    /// the currently scheduled generation; returns false for a stale
    /// notification (cancelled or replaced after the timer task sent it).
    pub fn acknowledge(&mut self, fired: &FiredWatcher) -> bool {
        match self.entries.get(&fired.kind) {
            Some(entry) if entry.generation == fired.generation => {
                self.entries.remove(&fired.kind);
                true
            }
            _ => false,
        }
    }

    /// Whether a watcher of this kind is pending
    pub fn is_active(&self, kind: WatcherKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Remaining delay of a pending watcher
    pub fn due_in(&self, kind: WatcherKind) -> Option<Duration> {
        self.entries
            .get(&kind)
            .map(|entry| entry.due_at.saturating_duration_since(Instant::now()))
    }

    /// Names of all pending watchers, sorted
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    /// Number of pending watchers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no watcher is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Drop for Scheduler<T> {
    fn drop(&mut self) {
        for entry in self.entries.values() {
            entry.handle.abort();
        }
    }
}
