// src/engine/monitor.rs
//! Periodic statistics report through `tracing`

use crossbeam::channel::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::engine::signal_engine::EngineShared;
use crate::engine::task::BackgroundTask;
use crate::error::SimResult;

pub(crate) fn spawn(shared: Arc<EngineShared>) -> SimResult<BackgroundTask> {
    let interval = Duration::from_millis(shared.config.monitor.report_interval_ms);

    BackgroundTask::spawn("biosim-monitor", move |stop_rx| {
        let mut last_underruns = 0;
        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let stats = shared.performance_stats();
            info!(
                consumed = stats.samples_consumed,
                generated = stats.samples_generated,
                underruns = stats.underruns,
                max_tick_ns = stats.max_tick_nanos,
                occupancy = stats.buffer_occupancy,
                utilization = stats.buffer_utilization(),
                "output statistics"
            );
            if stats.underruns > last_underruns {
                warn!(new = stats.underruns - last_underruns, "output underruns since last report");
            }
            last_underruns = stats.underruns;
        }
    })
}
