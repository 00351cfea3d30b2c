// src/engine/stats.rs
//! Diagnostic counters written by the output tick

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by the consumer side.
///
/// Only the output tick writes them; monitors read them without locking and
/// may see a snapshot that is not consistent across fields.
#[derive(Debug, Default)]
pub struct PerformanceCounters {
    consumed: AtomicU64,
    underruns: AtomicU64,
    max_tick_nanos: AtomicU64,
}

impl PerformanceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_tick(&self, elapsed_nanos: u64, underrun: bool) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
        if underrun {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
        self.max_tick_nanos.fetch_max(elapsed_nanos, Ordering::Relaxed);
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub fn max_tick_nanos(&self) -> u64 {
        self.max_tick_nanos.load(Ordering::Relaxed)
    }
}

/// Best-effort performance snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PerformanceStats {
    /// Output ticks since the engine was created
    pub samples_consumed: u64,
    /// Worst observed tick duration
    pub max_tick_nanos: u64,
    /// Ticks that found the ring empty and wrote mid-scale
    pub underruns: u64,
    pub buffer_occupancy: usize,
    pub buffer_capacity: usize,
    /// Samples generated in the current run
    pub samples_generated: u64,
}

impl PerformanceStats {
    pub fn buffer_utilization(&self) -> f32 {
        if self.buffer_capacity <= 1 {
            return 0.0;
        }
        self.buffer_occupancy as f32 / (self.buffer_capacity - 1) as f32
    }

    pub fn underrun_ratio(&self) -> f64 {
        if self.samples_consumed == 0 {
            0.0
        } else {
            self.underruns as f64 / self.samples_consumed as f64
        }
    }
}
