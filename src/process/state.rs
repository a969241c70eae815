use serde::{Deserialize, Serialize};

/// Process state in the monitored lifecycle
///
/// `Unmonitored` is the initial state and the terminal state for
/// automation: nothing leaves it without a user command or a retry
/// scheduled before entering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Unmonitored,
    Starting,
    Up,
    Stopping,
    Stopped,
    Down,
    Restarting,
}

impl ProcessState {
    /// States a start command is accepted from
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            ProcessState::Unmonitored | ProcessState::Stopped | ProcessState::Down
        )
    }

    /// States a stop command is accepted from
    pub fn can_stop(&self) -> bool {
        matches!(
            self,
            ProcessState::Up | ProcessState::Starting | ProcessState::Restarting
        )
    }

    /// States in which a crash report is meaningful
    ///
    /// A crash while stopping or already down/stopped is either expected
    /// or stale and is not routed through the triggers.
    pub fn accepts_crash(&self) -> bool {
        matches!(
            self,
            ProcessState::Up | ProcessState::Starting | ProcessState::Restarting
        )
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Unmonitored => write!(f, "unmonitored"),
            ProcessState::Starting => write!(f, "starting"),
            ProcessState::Up => write!(f, "up"),
            ProcessState::Stopping => write!(f, "stopping"),
            ProcessState::Stopped => write!(f, "stopped"),
            ProcessState::Down => write!(f, "down"),
            ProcessState::Restarting => write!(f, "restarting"),
        }
    }
}
