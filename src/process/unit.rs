use crate::config::ProcessConfig;
use crate::history::{HistoryLog, StateTransition};
use crate::process::executor::ProcessExecutor;
use crate::process::handle::ProcessHandle;
use crate::process::state::ProcessState;
use crate::scheduler::{FiredWatcher, Scheduler, WatcherKind};
use crate::trigger::{Trigger, TriggerSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// User commands a process unit accepts
///
/// Commands are delivered asynchronously and applied in arrival order;
/// a command that is invalid for the current state is logged and
/// ignored, never answered with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserCommand {
    Start,
    Stop,
    Restart,
    Monitor,
    Unmonitor,
}

/// Events delivered to a process unit's queue
#[derive(Debug)]
pub(crate) enum ProcessEvent {
    Command(UserCommand),
    Crash { at: Instant },
    Fired(FiredWatcher),
    Query(Query),
    Shutdown,
}

impl From<FiredWatcher> for ProcessEvent {
    fn from(fired: FiredWatcher) -> Self {
        ProcessEvent::Fired(fired)
    }
}

/// Read-only questions answered from inside the unit
///
/// Replies travel over oneshot channels, so an answer reflects every
/// event that was enqueued before the question.
#[derive(Debug)]
pub(crate) enum Query {
    State(oneshot::Sender<ProcessState>),
    Watchers(oneshot::Sender<Vec<String>>),
    History(oneshot::Sender<HistoryLog>),
    Triggers(oneshot::Sender<Vec<TriggerSnapshot>>),
    Pid(oneshot::Sender<Option<u32>>),
}

/// One supervised process: state machine, history, triggers, and
/// watcher registry behind a single event queue
///
/// All fields are owned by the unit's task; nothing is shared. Events
/// are processed one at a time, so every observable effect of an event
/// lands before the next one is looked at.
pub(crate) struct ProcessUnit {
    config: ProcessConfig,
    executor: Arc<dyn ProcessExecutor>,
    state: ProcessState,
    pid: Option<u32>,
    history: HistoryLog,
    triggers: Vec<Trigger>,
    scheduler: Scheduler<ProcessEvent>,
    rx: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl ProcessUnit {
    /// Spawn the unit task and return the handle commanding it
    pub(crate) fn spawn(config: ProcessConfig, executor: Arc<dyn ProcessExecutor>) -> ProcessHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let triggers = config.triggers.iter().map(Trigger::from_config).collect();

        let unit = Self {
            scheduler: Scheduler::new(&tx),
            state: ProcessState::Unmonitored,
            pid: None,
            history: HistoryLog::new(),
            triggers,
            executor,
            rx,
            config,
        };

        let name = unit.config.name.clone();
        tokio::spawn(unit.run());

        ProcessHandle::new(name, tx)
    }

    /// Drive the unit until shutdown or until every handle is gone
    async fn run(mut self) {
        debug!("Process {} unit started", self.config.name);

        while let Some(event) = self.rx.recv().await {
            match event {
                ProcessEvent::Command(command) => self.handle_command(command).await,
                ProcessEvent::Crash { at } => self.handle_crash(at).await,
                ProcessEvent::Fired(fired) => self.handle_fired(fired).await,
                ProcessEvent::Query(query) => self.handle_query(query),
                ProcessEvent::Shutdown => break,
            }
        }

        self.scheduler.cancel_all();
        debug!("Process {} unit stopped", self.config.name);
    }

    async fn handle_command(&mut self, command: UserCommand) {
        // Start, monitor and unmonitor mark manual intervention: consumed
        // retries start over. Stop and restart leave the budget alone.
        if matches!(
            command,
            UserCommand::Start | UserCommand::Monitor | UserCommand::Unmonitor
        ) {
            for trigger in &mut self.triggers {
                trigger.reset_retries();
            }
        }

        match command {
            UserCommand::Start => self.start().await,
            UserCommand::Stop => self.stop().await,
            UserCommand::Restart => self.restart().await,
            UserCommand::Monitor => self.monitor().await,
            UserCommand::Unmonitor => self.unmonitor(),
        }
    }

    async fn start(&mut self) {
        if !self.state.can_start() {
            debug!(
                "Process {} ignoring start in state {}",
                self.config.name, self.state
            );
            return;
        }

        self.transition(ProcessState::Starting, None);
        self.spawn_and_confirm().await;
    }

    /// Adopt an already-running process from its pid file, else start fresh
    async fn monitor(&mut self) {
        if !self.state.can_start() {
            debug!(
                "Process {} ignoring monitor in state {}",
                self.config.name, self.state
            );
            return;
        }

        if let Some(pid) = self.executor.load_pid_from_file().await {
            if self.executor.is_alive(pid).await {
                info!("Process {} adopting running pid {}", self.config.name, pid);
                self.transition(ProcessState::Starting, None);
                self.pid = Some(pid);
                self.mark_up();
                return;
            }
        }

        self.transition(ProcessState::Starting, None);
        self.spawn_and_confirm().await;
    }

    async fn stop(&mut self) {
        if !self.state.can_stop() {
            debug!(
                "Process {} ignoring stop in state {}",
                self.config.name, self.state
            );
            return;
        }

        self.transition(ProcessState::Stopping, None);
        if let Some(pid) = self.pid.take() {
            if let Err(e) = self.executor.signal_kill(pid).await {
                warn!(
                    "Process {} failed to signal pid {}: {}",
                    self.config.name, pid, e
                );
            }
        }
        self.transition(ProcessState::Stopped, None);
        self.scheduler.cancel_all();
    }

    async fn restart(&mut self) {
        if self.state.can_stop() {
            self.transition(ProcessState::Restarting, None);
            self.stop().await;
            self.start().await;
        } else if self.state.can_start() {
            self.start().await;
        } else {
            debug!(
                "Process {} ignoring restart in state {}",
                self.config.name, self.state
            );
        }
    }

    /// Valid from every state: an unmonitor on an already-unmonitored
    /// process still records the user action and cancels a pending
    /// flapping retry.
    fn unmonitor(&mut self) {
        info!("Process {} unmonitored by user", self.config.name);
        self.transition(ProcessState::Unmonitored, Some("unmonitor by user"));
        self.pid = None;
        self.scheduler.cancel_all();
    }

    /// Route a crash through the state machine and the triggers
    async fn handle_crash(&mut self, at: Instant) {
        if !self.state.accepts_crash() {
            debug!(
                "Process {} ignoring crash report in state {}",
                self.config.name, self.state
            );
            return;
        }

        warn!("Process {} is down", self.config.name);
        self.pid = None;
        self.transition_at(ProcessState::Down, None, at);
        self.scheduler.cancel_all();

        let mut flapping = false;
        let mut retry_after = None;
        for trigger in &mut self.triggers {
            let action = trigger.on_crash(at);
            if action.flapping {
                flapping = true;
                retry_after = retry_after.or(action.retry_after);
            }
        }

        if flapping {
            warn!("Process {} is flapping, monitoring stops", self.config.name);
            self.transition(ProcessState::Unmonitored, Some("flapping"));
            // Scheduled after cancel_all above, so the retry is the one
            // watcher that survives leaving the monitored states.
            if let Some(delay) = retry_after {
                info!("Process {} will retry in {:?}", self.config.name, delay);
                self.scheduler.schedule(WatcherKind::Restore, delay);
            }
        } else {
            self.scheduler
                .schedule(WatcherKind::Restore, self.config.restart_grace());
        }
    }

    async fn handle_fired(&mut self, fired: FiredWatcher) {
        if !self.scheduler.acknowledge(&fired) {
            debug!(
                "Process {} dropping stale {} watcher",
                self.config.name, fired.kind
            );
            return;
        }

        match fired.kind {
            WatcherKind::Restore => self.restore().await,
            WatcherKind::CheckCrash => self.probe(false).await,
            WatcherKind::CheckAlive => self.probe(true).await,
        }
    }

    /// Bring the process back after a crash grace or a flapping retry
    async fn restore(&mut self) {
        match self.state {
            ProcessState::Unmonitored | ProcessState::Down => {
                info!("Process {} restoring", self.config.name);
                self.transition(ProcessState::Starting, None);
                self.spawn_and_confirm().await;
            }
            _ => debug!(
                "Process {} ignoring restore in state {}",
                self.config.name, self.state
            ),
        }
    }

    /// Probe liveness; the periodic probe re-arms itself while the process is up
    async fn probe(&mut self, periodic: bool) {
        if self.state != ProcessState::Up {
            debug!(
                "Process {} skipping liveness probe in state {}",
                self.config.name, self.state
            );
            return;
        }

        let alive = match self.pid {
            Some(pid) => self.executor.is_alive(pid).await,
            None => false,
        };

        if !alive {
            self.handle_crash(Instant::now()).await;
        } else if periodic {
            self.scheduler
                .schedule(WatcherKind::CheckAlive, self.config.check_interval());
        }
    }

    async fn spawn_and_confirm(&mut self) {
        match self.executor.spawn().await {
            Ok(pid) => {
                if self.executor.is_alive(pid).await {
                    self.pid = Some(pid);
                    self.mark_up();
                } else {
                    // Died before the liveness check: an ordinary crash
                    self.handle_crash(Instant::now()).await;
                }
            }
            Err(e) => {
                warn!("Process {} failed to spawn: {}", self.config.name, e);
                self.handle_crash(Instant::now()).await;
            }
        }
    }

    fn mark_up(&mut self) {
        self.transition(ProcessState::Up, None);
        self.scheduler.cancel_all();
        self.scheduler
            .schedule(WatcherKind::CheckCrash, self.config.start_grace());
        self.scheduler
            .schedule(WatcherKind::CheckAlive, self.config.check_interval());
    }

    fn handle_query(&mut self, query: Query) {
        match query {
            Query::State(tx) => {
                let _ = tx.send(self.state);
            }
            Query::Watchers(tx) => {
                let _ = tx.send(self.scheduler.active_names());
            }
            Query::History(tx) => {
                let _ = tx.send(self.history.clone());
            }
            Query::Triggers(tx) => {
                let _ = tx.send(self.triggers.iter().map(Trigger::snapshot).collect());
            }
            Query::Pid(tx) => {
                let _ = tx.send(self.pid);
            }
        }
    }

    fn transition(&mut self, state: ProcessState, reason: Option<&str>) {
        self.transition_at(state, reason, Instant::now());
    }

    /// Apply a state change and record it; every transition appends
    /// exactly one history entry
    fn transition_at(&mut self, state: ProcessState, reason: Option<&str>, at: Instant) {
        info!(
            "Process {} transitioning {} -> {}",
            self.config.name, self.state, state
        );
        self.state = state;
        self.history.push(match reason {
            Some(reason) => StateTransition::with_reason(state, reason, at),
            None => StateTransition::new(state, at),
        });
    }
}
