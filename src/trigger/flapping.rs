use crate::config::FlappingConfig;
use crate::trigger::{RetryPolicy, TriggerAction, TriggerSnapshot};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window crash counter
///
/// Declares a process flapping once `times` crashes land inside the
/// trailing `within` window. The window is measured from the newest
/// crash and is inclusive: two crashes exactly `within` apart still
/// count together. Firing clears the recorded crashes, so a fresh
/// window starts with the next crash after recovery.
#[derive(Debug, Clone)]
pub struct FlappingTrigger {
    times: usize,
    within: Duration,
    crashes: VecDeque<Instant>,
    retry: RetryPolicy,
}

impl FlappingTrigger {
    pub fn new(config: FlappingConfig) -> Self {
        Self {
            times: config.times,
            within: config.within(),
            crashes: VecDeque::new(),
            retry: RetryPolicy::new(config.retry_in(), config.retry_times),
        }
    }

    /// Record a crash and decide whether the process is flapping
    pub fn record_crash(&mut self, at: Instant) -> TriggerAction {
        self.crashes.push_back(at);
        self.prune(at);

        if self.crashes.len() >= self.times {
            self.crashes.clear();
            TriggerAction {
                flapping: true,
                retry_after: self.retry.on_flapping(),
            }
        } else {
            TriggerAction::none()
        }
    }

    /// Drop recorded crashes that fell out of the window ending at `newest`
    fn prune(&mut self, newest: Instant) {
        while let Some(&oldest) = self.crashes.front() {
            if newest.duration_since(oldest) > self.within {
                self.crashes.pop_front();
            } else {
                break;
            }
        }
    }

    /// Forget the retries consumed since the last user command
    pub fn reset_retries(&mut self) {
        self.retry.reset();
    }

    /// Read-only view of the trigger's configuration and runtime state
    pub fn snapshot(&self) -> TriggerSnapshot {
        TriggerSnapshot {
            times: self.times,
            within: self.within,
            recent_crashes: self.crashes.len(),
            retry_in: self.retry.retry_in(),
            retry_times: self.retry.retry_times(),
            retries_used: self.retry.attempts(),
        }
    }
}
