use crate::process::ProcessState;
use std::collections::VecDeque;
use tokio::time::Instant;

/// A single recorded state transition
///
/// `reason` is present only for transitions outside ordinary lifecycle
/// progression, e.g. `"flapping"` or `"unmonitor by user"`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub state: ProcessState,
    pub reason: Option<String>,
    pub at: Instant,
}

impl StateTransition {
    /// Create a transition record for ordinary lifecycle progression
    pub fn new(state: ProcessState, at: Instant) -> Self {
        Self {
            state,
            reason: None,
            at,
        }
    }

    /// Create a transition record carrying a reason
    pub fn with_reason(state: ProcessState, reason: impl Into<String>, at: Instant) -> Self {
        Self {
            state,
            reason: Some(reason.into()),
            at,
        }
    }
}

/// Append-only record of the state transitions of one process
///
/// Entries are ordered oldest first and their `at` instants are
/// non-decreasing. The log can be read in place or consumed
/// progressively from the front.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: VecDeque<StateTransition>,
}

impl HistoryLog {
    /// Create an empty history log
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append a transition record
    ///
    /// A crash report can carry a detection instant older than the last
    /// recorded transition; such an `at` is clamped to the last entry's
    /// instant so the log stays non-decreasing.
    pub fn push(&mut self, mut transition: StateTransition) {
        if let Some(last) = self.entries.back() {
            if transition.at < last.at {
                transition.at = last.at;
            }
        }
        self.entries.push_back(transition);
    }

    /// Get the most recent transition, if any
    pub fn last(&self) -> Option<&StateTransition> {
        self.entries.back()
    }

    /// Get the states of all transitions, oldest first
    pub fn states(&self) -> Vec<ProcessState> {
        self.entries.iter().map(|t| t.state).collect()
    }

    /// Get the states of the `n` most recent transitions, oldest first
    pub fn last_states(&self, n: usize) -> Vec<ProcessState> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).map(|t| t.state).collect()
    }

    /// Iterate over all transitions, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &StateTransition> {
        self.entries.iter()
    }

    /// Remove and return the oldest transition
    pub fn pop_front(&mut self) -> Option<StateTransition> {
        self.entries.pop_front()
    }

    /// Remove and return the `n` oldest transitions
    pub fn drain_front(&mut self, n: usize) -> Vec<StateTransition> {
        let n = n.min(self.entries.len());
        self.entries.drain(..n).collect()
    }

    /// Number of recorded transitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no transitions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
