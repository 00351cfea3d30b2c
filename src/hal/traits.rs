// src/hal/traits.rs
//! Minimal traits over the output timer and the analog output

use crate::hal::types::{DacSample, HalError, TickCallback};

/// Analog output sink written once per output tick.
///
/// `write` is called from the timer context and must be non-blocking and
/// bounded in time.
pub trait AnalogOutput: Send + Sync {
    fn write(&self, sample: DacSample);
}

/// Periodic interrupt source driving the output cadence.
///
/// Implementations must guarantee that once [`disable`](Self::disable)
/// returns, no callback invocation is still running and none will start
/// until the timer is enabled again.
pub trait PeriodicTimer: Send {
    /// Install `callback` to run every `period_micros`. The timer stays
    /// disabled until [`enable`](Self::enable) is called.
    fn configure(&mut self, period_micros: u32, callback: TickCallback) -> Result<(), HalError>;

    fn enable(&mut self) -> Result<(), HalError>;

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Configured period, if any
    fn period_micros(&self) -> Option<u32>;
}

impl<T: AnalogOutput + ?Sized> AnalogOutput for std::sync::Arc<T> {
    fn write(&self, sample: DacSample) {
        (**self).write(sample)
    }
}
