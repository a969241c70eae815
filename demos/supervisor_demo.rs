use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vigil::config::{FlappingConfig, ProcessConfig, TriggerConfig};
use vigil::error::Result;
use vigil::process::{ProcessExecutor, ProcessManager};

/// In-memory executor for the demo: a healthy process stays up after
/// spawning, an unhealthy one is already dead when the supervisor
/// checks on it.
struct DemoExecutor {
    healthy: bool,
    inner: Mutex<DemoState>,
}

#[derive(Default)]
struct DemoState {
    next_pid: u32,
    alive: HashSet<u32>,
}

impl DemoExecutor {
    fn new(healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            healthy,
            inner: Mutex::new(DemoState {
                next_pid: 1000,
                ..DemoState::default()
            }),
        })
    }
}

#[async_trait]
impl ProcessExecutor for DemoExecutor {
    async fn spawn(&self) -> Result<u32> {
        let mut state = self.inner.lock().unwrap();
        let pid = state.next_pid;
        state.next_pid += 1;
        if self.healthy {
            state.alive.insert(pid);
        }
        Ok(pid)
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.inner.lock().unwrap().alive.contains(&pid)
    }

    async fn signal_kill(&self, pid: u32) -> Result<()> {
        self.inner.lock().unwrap().alive.remove(&pid);
        Ok(())
    }

    async fn load_pid_from_file(&self) -> Option<u32> {
        None
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("=== Vigil Supervision Demo ===\n");

    let manager = ProcessManager::new();

    // Configure a process that will crash after every start
    let mut crasher = ProcessConfig::new("crasher");
    crasher.restart_grace_secs = 1;
    crasher.triggers = vec![TriggerConfig::Flapping(FlappingConfig {
        times: 3, // Three crashes inside the window stop the monitoring
        within_secs: 10,
        retry_in_secs: None,
        retry_times: None,
    })];

    // Configure a stable process
    let mut stable = ProcessConfig::new("stable");
    stable.check_interval_secs = 2;

    println!("Registering processes...");
    let crasher_handle = manager.add(crasher, DemoExecutor::new(false)).await?;
    let stable_handle = manager.add(stable, DemoExecutor::new(true)).await?;
    println!("  - Crasher process: {}", crasher_handle.name());
    println!("  - Stable process: {}\n", stable_handle.name());

    crasher_handle.start()?;
    stable_handle.start()?;

    // Watch the supervisor work for a few seconds
    println!("Running supervision (5 seconds)...\n");
    for i in 0..5 {
        tokio::time::sleep(Duration::from_secs(1)).await;

        println!("--- Status #{} ---", i + 1);
        for name in manager.names().await {
            let handle = manager.get(&name).await?;
            let state = handle.current_state().await?;
            let watchers = handle.active_watcher_names().await?;

            println!("  {} [{}]: watchers={:?}", name, state, watchers);
        }
        println!();
    }

    // Final histories
    println!("=== Histories ===");
    for name in manager.names().await {
        let handle = manager.get(&name).await?;

        println!("  {}:", name);
        for entry in handle.history().await?.iter() {
            match &entry.reason {
                Some(reason) => println!("    -> {} ({})", entry.state, reason),
                None => println!("    -> {}", entry.state),
            }
        }
    }

    // Cleanup
    println!("\nCleaning up...");
    manager.remove_all().await;

    println!("Demo complete!");
    Ok(())
}
