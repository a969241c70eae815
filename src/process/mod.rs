// Process module - per-process supervision units and their collaborators

pub mod executor;
mod handle;
mod manager;
mod state;
mod unit;

pub use executor::ProcessExecutor;
pub use handle::ProcessHandle;
pub use manager::ProcessManager;
pub use state::ProcessState;
pub use unit::UserCommand;
