// src/hal/types.rs
//! Types shared by the output hardware abstractions

use thiserror::Error;

use crate::config::constants::signal;

/// One quantized DAC code
pub type DacSample = u8;

/// Code written whenever no signal is being produced
pub const DAC_MID_SCALE: DacSample = signal::DAC_MID_SCALE;

/// Work executed on every timer tick
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Hardware abstraction errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HalError {
    #[error("timer period must be non-zero")]
    InvalidPeriod,

    #[error("timer enabled before a callback was configured")]
    NotConfigured,

    #[error("timer thread failed: {0}")]
    TimerThread(String),
}
