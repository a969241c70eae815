use crate::config::ProcessConfig;
use crate::error::{Result, VigilError};
use crate::process::executor::ProcessExecutor;
use crate::process::handle::ProcessHandle;
use crate::process::unit::ProcessUnit;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Registry mapping process names to their running units
///
/// The map is the only state shared between callers; each unit owns its
/// state behind its own queue. Cloning the manager clones a handle to
/// the registry, not the registry.
#[derive(Clone, Default)]
pub struct ProcessManager {
    processes: Arc<RwLock<HashMap<String, ProcessHandle>>>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config`, spawn its unit, and register it under its name
    ///
    /// The executor is the process-execution collaborator serving this
    /// one process. The unit starts in the unmonitored state; nothing
    /// runs until a command arrives.
    pub async fn add(
        &self,
        config: ProcessConfig,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Result<ProcessHandle> {
        config.validate()?;

        let mut processes = self.processes.write().await;
        if processes.contains_key(&config.name) {
            return Err(VigilError::ProcessAlreadyExists(config.name.clone()));
        }

        tracing::info!("Registering process {}", config.name);

        let handle = ProcessUnit::spawn(config, executor);
        processes.insert(handle.name().to_string(), handle.clone());

        Ok(handle)
    }

    /// Handle of a registered process
    pub async fn get(&self, name: &str) -> Result<ProcessHandle> {
        self.processes
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| VigilError::ProcessNotFound(name.to_string()))
    }

    /// Names of all registered processes, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processes.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered processes
    pub async fn len(&self) -> usize {
        self.processes.read().await.len()
    }

    /// Whether no process is registered
    pub async fn is_empty(&self) -> bool {
        self.processes.read().await.is_empty()
    }

    /// Unregister a process and wind its unit down
    ///
    /// The unit cancels its watchers and drops its state; the underlying
    /// OS process, if any, is left to the execution collaborator.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let handle = self
            .processes
            .write()
            .await
            .remove(name)
            .ok_or_else(|| VigilError::ProcessNotFound(name.to_string()))?;

        tracing::info!("Removing process {}", name);
        // The unit may already be gone if its queue closed first
        let _ = handle.shutdown();

        Ok(())
    }

    /// Wind down every registered unit and clear the registry
    pub async fn remove_all(&self) {
        let mut processes = self.processes.write().await;
        for (name, handle) in processes.drain() {
            tracing::info!("Removing process {}", name);
            let _ = handle.shutdown();
        }
    }
}
