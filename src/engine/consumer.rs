// src/engine/consumer.rs
//! Output tick executed from the timer context
//!
//! The driver owns only what a tick needs: the read half of the ring, the
//! counters and the analog sink. A tick does no floating point, takes no
//! lock and never allocates.

use std::sync::Arc;

use crate::buffer::RingConsumer;
use crate::engine::stats::PerformanceCounters;
use crate::hal::{AnalogOutput, TickCallback, DAC_MID_SCALE};
use crate::utils::{MonotonicTimeProvider, TimeProvider};

pub struct OutputDriver<C: TimeProvider = MonotonicTimeProvider> {
    consumer: RingConsumer,
    counters: Arc<PerformanceCounters>,
    sink: Arc<dyn AnalogOutput>,
    clock: C,
}

impl OutputDriver<MonotonicTimeProvider> {
    pub fn new(
        consumer: RingConsumer,
        counters: Arc<PerformanceCounters>,
        sink: Arc<dyn AnalogOutput>,
    ) -> Self {
        Self::with_clock(consumer, counters, sink, MonotonicTimeProvider::new())
    }
}

impl<C: TimeProvider + 'static> OutputDriver<C> {
    pub fn with_clock(
        consumer: RingConsumer,
        counters: Arc<PerformanceCounters>,
        sink: Arc<dyn AnalogOutput>,
        clock: C,
    ) -> Self {
        Self {
            consumer,
            counters,
            sink,
            clock,
        }
    }

    /// Pop one sample and write it, or write mid-scale on underrun
    #[inline]
    pub fn tick(&mut self) {
        let started = self.clock.now_nanos();
        let underrun = match self.consumer.pop() {
            Some(sample) => {
                self.sink.write(sample);
                false
            }
            None => {
                self.sink.write(DAC_MID_SCALE);
                true
            }
        };
        let elapsed = self.clock.now_nanos().saturating_sub(started);
        self.counters.record_tick(elapsed, underrun);
    }

    /// Move the driver into a timer callback
    pub fn into_callback(mut self) -> TickCallback {
        Box::new(move || self.tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleRing;
    use crate::hal::SimulatedDac;
    use crate::utils::MockTimeProvider;

    #[test]
    fn test_tick_drains_then_underruns() {
        let (mut tx, rx) = SampleRing::split(8).unwrap();
        let counters = Arc::new(PerformanceCounters::new());
        let dac = Arc::new(SimulatedDac::with_capture(8));
        let mut driver = OutputDriver::with_clock(
            rx,
            Arc::clone(&counters),
            dac.clone(),
            MockTimeProvider::with_auto_step(0, 250),
        );

        tx.push_slice(&[10, 20]);
        for _ in 0..3 {
            driver.tick();
        }

        assert_eq!(dac.captured(), vec![10, 20, DAC_MID_SCALE]);
        assert_eq!(counters.consumed(), 3);
        assert_eq!(counters.underruns(), 1);
        assert_eq!(counters.max_tick_nanos(), 250);
    }
}
