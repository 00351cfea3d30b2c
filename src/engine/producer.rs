// src/engine/producer.rs
//! Block producer loop
//!
//! Each pass generates at most one block. A pass that finds too little free
//! space yields for `yield_micros`; with no running signal the loop sleeps
//! `idle_ms`. Stopping the signal is observed at the next pass.

use crossbeam::channel::RecvTimeoutError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::engine::signal_engine::EngineShared;
use crate::engine::task::BackgroundTask;
use crate::error::SimResult;

/// Outcome of one producer pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerStep {
    /// A block of this many samples was pushed
    Generated(usize),
    /// Running, but less than one block of free space (or the control lock
    /// was busy)
    Idle,
    /// No running signal, or the run changed during the pass
    Inactive,
}

pub(crate) fn spawn(shared: Arc<EngineShared>) -> SimResult<BackgroundTask> {
    let yield_wait = Duration::from_micros(shared.config.producer.yield_micros);
    let idle_wait = Duration::from_millis(shared.config.producer.idle_ms);

    BackgroundTask::spawn("biosim-producer", move |stop_rx| loop {
        let wait = match panic::catch_unwind(AssertUnwindSafe(|| shared.produce_once())) {
            Ok(ProducerStep::Generated(_)) => Duration::ZERO,
            Ok(ProducerStep::Idle) => yield_wait,
            Ok(ProducerStep::Inactive) => idle_wait,
            Err(_) => {
                error!("producer pass panicked");
                shared.enter_error("producer panicked");
                idle_wait
            }
        };

        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    })
}
