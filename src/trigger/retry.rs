use std::time::Duration;

/// Automatic-retry policy consulted when a process is declared flapping
///
/// `retry_in` is the delay before a retry is attempted; without it the
/// process stays unmonitored until someone intervenes. `retry_times`
/// caps how many retries may be consumed between user commands; absent
/// means unlimited.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    retry_in: Option<Duration>,
    retry_times: Option<u32>,
    attempts: u32,
}

impl RetryPolicy {
    /// Create a policy from the configured delay and cap
    pub fn new(retry_in: Option<Duration>, retry_times: Option<u32>) -> Self {
        Self {
            retry_in,
            retry_times,
            attempts: 0,
        }
    }

    /// Decide whether an automatic retry may be scheduled
    ///
    /// Returns the delay to wait before restoring the process, or `None`
    /// when no retry is configured or the cap is spent. A granted retry
    /// counts against the cap immediately.
    pub fn on_flapping(&mut self) -> Option<Duration> {
        let retry_in = self.retry_in?;

        if let Some(cap) = self.retry_times {
            if self.attempts >= cap {
                return None;
            }
        }

        self.attempts += 1;
        Some(retry_in)
    }

    /// Forget the retries consumed so far
    ///
    /// Called on explicit user commands only; an automatic restore never
    /// earns back retry budget.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Retries consumed since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Configured retry delay, if any
    pub fn retry_in(&self) -> Option<Duration> {
        self.retry_in
    }

    /// Configured retry cap, if any
    pub fn retry_times(&self) -> Option<u32> {
        self.retry_times
    }
}
