// src/hal/simulator.rs
//! Software stand-ins for the DAC and the hardware timer
//!
//! [`ManualTimer`] only fires when a test asks it to, which makes the
//! producer/consumer interplay fully deterministic. [`ThreadTimer`] fires from
//! a host thread on wall-clock deadlines and is what the host harness uses.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::constants::performance;
use crate::hal::traits::{AnalogOutput, PeriodicTimer};
use crate::hal::types::{DacSample, HalError, TickCallback, DAC_MID_SCALE};

/// DAC that remembers the last code and optionally records every write
pub struct SimulatedDac {
    last: AtomicU8,
    writes: AtomicU64,
    capture: Box<[AtomicU8]>,
}

impl SimulatedDac {
    pub fn new() -> Self {
        Self::with_capture(0)
    }

    /// Record the first `capacity` writes (lock-free; later writes only
    /// update the last value)
    pub fn with_capture(capacity: usize) -> Self {
        Self {
            last: AtomicU8::new(DAC_MID_SCALE),
            writes: AtomicU64::new(0),
            capture: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn last_value(&self) -> DacSample {
        self.last.load(Ordering::Acquire)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    /// Copy of the recorded writes, oldest first
    pub fn captured(&self) -> Vec<DacSample> {
        let count = (self.write_count() as usize).min(self.capture.len());
        self.capture[..count]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }

    /// Forget the recorded writes and start capturing again
    pub fn clear_capture(&self) {
        self.writes.store(0, Ordering::Release);
    }
}

impl Default for SimulatedDac {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogOutput for SimulatedDac {
    #[inline]
    fn write(&self, sample: DacSample) {
        self.last.store(sample, Ordering::Release);
        let index = self.writes.fetch_add(1, Ordering::AcqRel) as usize;
        if let Some(slot) = self.capture.get(index) {
            slot.store(sample, Ordering::Relaxed);
        }
    }
}

/// Callback slot and enable flag shared between a timer and its firing side.
///
/// The firing side only ever `try_lock`s the slot. The control side takes
/// it after clearing `enabled`, so a tick never waits on it: it either runs
/// the callback or is dropped like a masked interrupt.
struct TimerCore {
    enabled: AtomicBool,
    configured: AtomicBool,
    period_micros: AtomicU32,
    callback: Mutex<Option<TickCallback>>,
    fired: AtomicU64,
}

impl TimerCore {
    fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            configured: AtomicBool::new(false),
            period_micros: AtomicU32::new(0),
            callback: Mutex::new(None),
            fired: AtomicU64::new(0),
        }
    }

    fn fire(&self) -> bool {
        let Some(mut slot) = self.callback.try_lock() else {
            return false;
        };
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        match slot.as_mut() {
            Some(callback) => {
                callback();
                self.fired.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn install(&self, period_micros: u32, callback: TickCallback) -> Result<(), HalError> {
        if period_micros == 0 {
            return Err(HalError::InvalidPeriod);
        }
        self.quiesce();
        *self.callback.lock() = Some(callback);
        self.period_micros.store(period_micros, Ordering::Release);
        self.configured.store(true, Ordering::Release);
        Ok(())
    }

    fn enable(&self) -> Result<(), HalError> {
        if !self.configured.load(Ordering::Acquire) {
            return Err(HalError::NotConfigured);
        }
        self.enabled.store(true, Ordering::Release);
        Ok(())
    }

    /// Clear the enable flag and wait out any in-flight callback
    fn quiesce(&self) {
        self.enabled.store(false, Ordering::Release);
        drop(self.callback.lock());
    }

    fn period(&self) -> Option<u32> {
        match self.period_micros.load(Ordering::Acquire) {
            0 => None,
            period => Some(period),
        }
    }
}

/// Timer fired explicitly through a [`ManualTimerHandle`]
pub struct ManualTimer {
    core: Arc<TimerCore>,
}

/// Test-side handle of a [`ManualTimer`]
#[derive(Clone)]
pub struct ManualTimerHandle {
    core: Arc<TimerCore>,
}

impl ManualTimer {
    pub fn new() -> (Self, ManualTimerHandle) {
        let core = Arc::new(TimerCore::new());
        (
            Self { core: Arc::clone(&core) },
            ManualTimerHandle { core },
        )
    }
}

impl ManualTimerHandle {
    /// Fire up to `ticks` times; returns how many ticks ran the callback.
    /// Ticks while the timer is disabled are dropped, as a hardware timer
    /// with its interrupt masked would.
    pub fn fire(&self, ticks: usize) -> usize {
        (0..ticks).filter(|_| self.core.fire()).count()
    }

    pub fn is_enabled(&self) -> bool {
        self.core.enabled.load(Ordering::Acquire)
    }

    pub fn fired(&self) -> u64 {
        self.core.fired.load(Ordering::Relaxed)
    }
}

impl PeriodicTimer for ManualTimer {
    fn configure(&mut self, period_micros: u32, callback: TickCallback) -> Result<(), HalError> {
        self.core.install(period_micros, callback)
    }

    fn enable(&mut self) -> Result<(), HalError> {
        self.core.enable()
    }

    fn disable(&mut self) {
        self.core.quiesce();
    }

    fn is_enabled(&self) -> bool {
        self.core.enabled.load(Ordering::Acquire)
    }

    fn period_micros(&self) -> Option<u32> {
        self.core.period()
    }
}

/// Timer firing from a host thread on wall-clock deadlines
pub struct ThreadTimer {
    core: Arc<TimerCore>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self {
            core: Arc::new(TimerCore::new()),
            stop_tx: None,
            worker: None,
        }
    }

    /// Callbacks executed so far
    pub fn fired(&self) -> u64 {
        self.core.fired.load(Ordering::Relaxed)
    }

    fn spawn_worker(&mut self, period: Duration) -> Result<(), HalError> {
        self.stop_worker();

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let core = Arc::clone(&self.core);

        let worker = thread::Builder::new()
            .name("biosim-timer".to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let now = Instant::now();
                    let mut replayed = 0;
                    while deadline <= now && replayed < performance::TIMER_MAX_CATCH_UP_TICKS {
                        core.fire();
                        deadline += period;
                        replayed += 1;
                    }
                    if deadline <= now {
                        // too far behind, drop the backlog
                        deadline = now + period;
                    }
                }
                debug!("timer thread exiting");
            })
            .map_err(|e| HalError::TimerThread(e.to_string()))?;

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        Ok(())
    }

    fn stop_worker(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("timer thread panicked");
            }
        }
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicTimer for ThreadTimer {
    fn configure(&mut self, period_micros: u32, callback: TickCallback) -> Result<(), HalError> {
        self.core.install(period_micros, callback)?;
        self.spawn_worker(Duration::from_micros(period_micros as u64))
    }

    fn enable(&mut self) -> Result<(), HalError> {
        self.core.enable()
    }

    fn disable(&mut self) {
        self.core.quiesce();
    }

    fn is_enabled(&self) -> bool {
        self.core.enabled.load(Ordering::Acquire)
    }

    fn period_micros(&self) -> Option<u32> {
        self.core.period()
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.core.quiesce();
        self.stop_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_never_waits_on_the_callback_slot() {
        let core = TimerCore::new();
        core.install(1000, Box::new(|| {})).unwrap();
        core.enable().unwrap();

        let held = core.callback.lock();
        // enabling and firing must not block while the slot is taken
        assert!(core.enable().is_ok());
        assert!(!core.fire());
        drop(held);

        assert!(core.fire());
        assert_eq!(core.fired.load(Ordering::Relaxed), 1);
    }
}
