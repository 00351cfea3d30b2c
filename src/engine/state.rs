// src/engine/state.rs
//! Output state machine

use serde::{Deserialize, Serialize};

/// Lifecycle of the output driver.
///
/// `Stopped -> Running`, `Running <-> Paused`, `Running | Paused -> Stopped`,
/// any state `-> Error`, and `Error -> Stopped` through an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    /// Timer disabled, output at mid-scale
    #[default]
    Stopped,
    /// Timer firing, consumer draining the ring
    Running,
    /// Timer disabled, ring and cursors frozen, output holds its last value
    Paused,
    /// Faulted; output at mid-scale until reset
    Error,
}

impl SignalState {
    pub fn can_transition_to(self, next: SignalState) -> bool {
        use SignalState::*;
        matches!(
            (self, next),
            (Stopped, Running)
                | (Running, Paused)
                | (Paused, Running)
                | (Running, Stopped)
                | (Paused, Stopped)
                | (Error, Stopped)
                | (_, Error)
        )
    }

    /// A signal is selected, whether or not the timer is firing
    pub fn is_active(self) -> bool {
        matches!(self, SignalState::Running | SignalState::Paused)
    }
}

impl std::fmt::Display for SignalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignalState::Stopped => "stopped",
            SignalState::Running => "running",
            SignalState::Paused => "paused",
            SignalState::Error => "error",
        };
        f.write_str(name)
    }
}
