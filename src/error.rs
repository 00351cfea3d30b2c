// src/error.rs
//! Unified error handling for the signal engine
//!
//! Errors only ever cross the control API. The producer and the output
//! interrupt never propagate errors to each other; they signal through the
//! state machine and the performance counters instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::state::SignalState;
use crate::hal::types::HalError;
use crate::models::SignalKind;
use crate::processing::filters::FilterError;

/// Crate-wide result alias
pub type SimResult<T> = Result<T, SimError>;

/// Errors returned by the engine control surface
#[derive(Debug, Error)]
pub enum SimError {
    /// `SignalKind::None` or another kind that cannot be started
    #[error("unsupported signal kind: {0:?}")]
    InvalidKind(SignalKind),

    /// Parameters addressed to a kind that is not the active one
    #[error("parameter set for {requested:?} rejected, active kind is {active:?}")]
    KindMismatch {
        requested: SignalKind,
        active: SignalKind,
    },

    /// A parameter that cannot be clamped into range (NaN or infinite)
    #[error("invalid parameter {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("invalid state transition {from:?} -> {to:?}")]
    InvalidTransition { from: SignalState, to: SignalState },

    /// Bounded wait on the control lock expired
    #[error("control lock not acquired within {timeout_ms} ms")]
    LockTimeout { timeout_ms: u64 },

    /// Thread spawn, timer programming or similar resource failure
    #[error("resource unavailable ({resource}): {reason}")]
    Resource {
        resource: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Hal(#[from] HalError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Broad error classes, used for logging and recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Rejected at the boundary; caller state unchanged
    Configuration,
    /// Lock or task/timer failure; engine stays in its last good state
    Resource,
    /// Request not valid in the current state
    State,
}

impl SimError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SimError::InvalidKind(_)
            | SimError::KindMismatch { .. }
            | SimError::InvalidParameter { .. }
            | SimError::Filter(_)
            | SimError::Config(_) => ErrorCategory::Configuration,
            SimError::LockTimeout { .. } | SimError::Resource { .. } | SimError::Hal(_) => {
                ErrorCategory::Resource
            }
            SimError::InvalidTransition { .. } => ErrorCategory::State,
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self.category(), ErrorCategory::Resource)
    }

    pub(crate) fn non_finite(field: &'static str, value: f32) -> Self {
        SimError::InvalidParameter {
            field,
            reason: format!("value {} is not finite", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            SimError::InvalidKind(SignalKind::None).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            SimError::LockTimeout { timeout_ms: 5 }.category(),
            ErrorCategory::Resource
        );
        assert!(SimError::LockTimeout { timeout_ms: 5 }.is_transient());
        assert!(!SimError::non_finite("heart_rate", f32::NAN).is_transient());
    }

    #[test]
    fn test_display_mentions_kinds() {
        let err = SimError::KindMismatch {
            requested: SignalKind::Ppg,
            active: SignalKind::Ecg,
        };
        let text = err.to_string();
        assert!(text.contains("Ppg"));
        assert!(text.contains("Ecg"));
    }
}
