// src/utils/time.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;
    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }
}

/// Monotonic nanoseconds since the provider was created.
///
/// Used to time consumer ticks; reading it neither allocates nor locks.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeProvider {
    origin: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    #[inline]
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Mock time provider for deterministic testing
#[derive(Debug, Default)]
pub struct MockTimeProvider {
    current_time: AtomicU64,
    step: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
            step: AtomicU64::new(0),
        }
    }

    /// Advance by `nanos` on every read, so each bracketed operation
    /// appears to take exactly that long
    pub fn with_auto_step(initial_time_nanos: u64, nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
            step: AtomicU64::new(nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        let step = self.step.load(Ordering::Relaxed);
        self.current_time.fetch_add(step, Ordering::Relaxed)
    }
}

pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

pub fn current_timestamp_micros() -> u64 {
    current_timestamp_nanos() / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_provider_never_goes_back() {
        let clock = MonotonicTimeProvider::new();
        let mut last = clock.now_nanos();
        for _ in 0..1000 {
            let now = clock.now_nanos();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_mock_provider_steps() {
        let clock = MockTimeProvider::with_auto_step(100, 50);
        assert_eq!(clock.now_nanos(), 100);
        assert_eq!(clock.now_nanos(), 150);

        let fixed = MockTimeProvider::new(10);
        fixed.advance_by(5);
        assert_eq!(fixed.now_nanos(), 15);
        fixed.set_time(1_000);
        assert_eq!(fixed.now_micros(), 1);
    }
}
