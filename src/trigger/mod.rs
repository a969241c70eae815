// Trigger module - anomaly detectors fed from process lifecycle events

mod flapping;
mod retry;

pub use flapping::FlappingTrigger;
pub use retry::RetryPolicy;

use crate::config::TriggerConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Closed set of trigger kinds a process can carry
///
/// Flapping is the only kind today; dispatching through this enum keeps
/// the state machine unchanged when further kinds are added.
#[derive(Debug, Clone)]
pub enum Trigger {
    Flapping(FlappingTrigger),
}

impl Trigger {
    /// Build a trigger from its configuration
    pub fn from_config(config: &TriggerConfig) -> Self {
        match config {
            TriggerConfig::Flapping(flapping) => {
                Trigger::Flapping(FlappingTrigger::new(flapping.clone()))
            }
        }
    }

    /// Feed a crash event through the trigger
    pub fn on_crash(&mut self, at: Instant) -> TriggerAction {
        match self {
            Trigger::Flapping(flapping) => flapping.record_crash(at),
        }
    }

    /// Reset per-user-command state (consumed retries)
    pub fn reset_retries(&mut self) {
        match self {
            Trigger::Flapping(flapping) => flapping.reset_retries(),
        }
    }

    /// Read-only snapshot of the trigger's runtime state
    pub fn snapshot(&self) -> TriggerSnapshot {
        match self {
            Trigger::Flapping(flapping) => flapping.snapshot(),
        }
    }
}

/// Decision a trigger hands back after a crash event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerAction {
    /// Whether the process was declared flapping
    pub flapping: bool,
    /// Delay before an automatic retry, when one was granted
    pub retry_after: Option<Duration>,
}

impl TriggerAction {
    /// Nothing to do: the crash stayed below the trigger's threshold
    pub fn none() -> Self {
        Self::default()
    }
}

/// Plain record describing a trigger's configuration and runtime state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSnapshot {
    pub times: usize,
    pub within: Duration,
    pub recent_crashes: usize,
    pub retry_in: Option<Duration>,
    pub retry_times: Option<u32>,
    pub retries_used: u32,
}
