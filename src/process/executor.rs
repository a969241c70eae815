use crate::error::Result;
use async_trait::async_trait;

/// Interface to the process-execution collaborator
///
/// The supervision core never touches real processes itself: launching,
/// liveness probing, signalling, and pid-file handling all live behind
/// this trait. One executor serves one supervised process, so `spawn`
/// and `load_pid_from_file` take no arguments.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Launch the process and return its OS pid
    async fn spawn(&self) -> Result<u32>;

    /// Whether the process behind `pid` is still running
    async fn is_alive(&self, pid: u32) -> bool;

    /// Deliver a kill signal to `pid`
    async fn signal_kill(&self, pid: u32) -> Result<()>;

    /// Pid recorded by a previous run, if a usable pid file exists
    async fn load_pid_from_file(&self) -> Option<u32>;
}
