// Shared test doubles for the integration suite
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use vigil::config::{FlappingConfig, ProcessConfig, TriggerConfig};
use vigil::error::{Result, VigilError};
use vigil::process::ProcessExecutor;

/// In-memory process executor: pids live in a set, spawns are counted,
/// and failure modes are scripted per test.
///
/// Every method takes effect instantly, so paused-clock tests advance
/// time only through the supervisor's own timers.
pub struct FakeExecutor {
    inner: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    next_pid: u32,
    alive: HashSet<u32>,
    spawns: u32,
    killed: Vec<u32>,
    pid_file: Option<u32>,
    fail_spawns: bool,
    stillborn: bool,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(FakeState {
                next_pid: 1000,
                ..FakeState::default()
            }),
        })
    }

    /// Kill a pid behind the supervisor's back
    pub fn kill(&self, pid: u32) {
        self.inner.lock().unwrap().alive.remove(&pid);
    }

    /// Make every subsequent spawn return an error
    pub fn fail_spawns(&self) {
        self.inner.lock().unwrap().fail_spawns = true;
    }

    /// Make every subsequent spawn succeed but die before confirmation
    pub fn stillborn(&self) {
        self.inner.lock().unwrap().stillborn = true;
    }

    /// Seed the pid file, optionally with a live process behind it
    pub fn write_pid_file(&self, pid: u32, alive: bool) {
        let mut state = self.inner.lock().unwrap();
        state.pid_file = Some(pid);
        if alive {
            state.alive.insert(pid);
        }
    }

    pub fn spawn_count(&self) -> u32 {
        self.inner.lock().unwrap().spawns
    }

    pub fn killed(&self) -> Vec<u32> {
        self.inner.lock().unwrap().killed.clone()
    }
}

#[async_trait]
impl ProcessExecutor for FakeExecutor {
    async fn spawn(&self) -> Result<u32> {
        let mut state = self.inner.lock().unwrap();
        state.spawns += 1;
        if state.fail_spawns {
            return Err(VigilError::SpawnError(
                "fake executor refuses to spawn".to_string(),
            ));
        }
        let pid = state.next_pid;
        state.next_pid += 1;
        if !state.stillborn {
            state.alive.insert(pid);
        }
        Ok(pid)
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.inner.lock().unwrap().alive.contains(&pid)
    }

    async fn signal_kill(&self, pid: u32) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.alive.remove(&pid);
        state.killed.push(pid);
        Ok(())
    }

    async fn load_pid_from_file(&self) -> Option<u32> {
        self.inner.lock().unwrap().pid_file
    }
}

/// Process config with a single flapping trigger and short graces
pub fn config_with_trigger(name: &str, flapping: FlappingConfig) -> ProcessConfig {
    let mut config = ProcessConfig::new(name);
    config.triggers = vec![TriggerConfig::Flapping(flapping)];
    config
}

/// Flapping settings without any retry
pub fn flapping(times: usize, within_secs: u64) -> FlappingConfig {
    FlappingConfig {
        times,
        within_secs,
        retry_in_secs: None,
        retry_times: None,
    }
}
