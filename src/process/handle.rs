use crate::error::{Result, VigilError};
use crate::history::HistoryLog;
use crate::process::state::ProcessState;
use crate::process::unit::{ProcessEvent, Query, UserCommand};
use crate::trigger::TriggerSnapshot;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Command and query surface of one process unit
///
/// Cloneable; every clone feeds the same event queue. Commands are
/// fire-and-forget: they enqueue and return, and the unit applies them
/// later in arrival order. Queries are answered by the unit itself, so
/// a reply reflects every command enqueued before it.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    name: String,
    tx: mpsc::UnboundedSender<ProcessEvent>,
}

impl ProcessHandle {
    pub(crate) fn new(name: String, tx: mpsc::UnboundedSender<ProcessEvent>) -> Self {
        Self { name, tx }
    }

    /// Name of the supervised process
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a user command
    pub fn send_command(&self, command: UserCommand) -> Result<()> {
        self.send(ProcessEvent::Command(command))
    }

    /// Start monitoring and bring the process up
    pub fn start(&self) -> Result<()> {
        self.send_command(UserCommand::Start)
    }

    /// Stop the process; monitoring stays off until the next command
    pub fn stop(&self) -> Result<()> {
        self.send_command(UserCommand::Stop)
    }

    /// Stop and start the process again
    pub fn restart(&self) -> Result<()> {
        self.send_command(UserCommand::Restart)
    }

    /// Start monitoring, adopting an already-running process if its pid
    /// file points at one
    pub fn monitor(&self) -> Result<()> {
        self.send_command(UserCommand::Monitor)
    }

    /// Stop monitoring without touching the process
    pub fn unmonitor(&self) -> Result<()> {
        self.send_command(UserCommand::Unmonitor)
    }

    /// Report that the watched process was found dead at `at`
    pub fn report_crash(&self, at: Instant) -> Result<()> {
        self.send(ProcessEvent::Crash { at })
    }

    /// Ask the unit to wind down, cancelling its pending watchers
    pub fn shutdown(&self) -> Result<()> {
        self.send(ProcessEvent::Shutdown)
    }

    /// Current lifecycle state
    pub async fn current_state(&self) -> Result<ProcessState> {
        self.query(Query::State).await
    }

    /// Names of the pending watchers, sorted
    pub async fn active_watcher_names(&self) -> Result<Vec<String>> {
        self.query(Query::Watchers).await
    }

    /// Copy of the transition history recorded so far
    pub async fn history(&self) -> Result<HistoryLog> {
        self.query(Query::History).await
    }

    /// Read-only snapshots of the configured triggers
    pub async fn trigger_snapshots(&self) -> Result<Vec<TriggerSnapshot>> {
        self.query(Query::Triggers).await
    }

    /// Pid of the underlying process while one is tracked
    pub async fn pid(&self) -> Result<Option<u32>> {
        self.query(Query::Pid).await
    }

    fn send(&self, event: ProcessEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| VigilError::UnitStopped(self.name.clone()))
    }

    async fn query<R>(&self, make: fn(oneshot::Sender<R>) -> Query) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.send(ProcessEvent::Query(make(tx)))?;
        rx.await
            .map_err(|_| VigilError::UnitStopped(self.name.clone()))
    }
}
