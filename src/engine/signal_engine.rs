// src/engine/signal_engine.rs
//! Engine instance owning the ring, the models and the output driver
//!
//! Two locks exist. `control` serialises the public API and holds the active
//! kind, state, parameter sets and the timer. `generator` guards everything
//! the producer mutates. When both are needed they are taken in that order.
//! The output tick takes neither.

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::buffer::SampleRing;
use crate::config::{ConfigError, SystemConfig};
use crate::engine::consumer::OutputDriver;
use crate::engine::generator::Generator;
use crate::engine::monitor;
use crate::engine::producer::{self, ProducerStep};
use crate::engine::state::SignalState;
use crate::engine::stats::{PerformanceCounters, PerformanceStats};
use crate::engine::task::BackgroundTask;
use crate::error::{SimError, SimResult};
use crate::hal::{AnalogOutput, PeriodicTimer, DAC_MID_SCALE};
use crate::models::{ModelMetrics, ParameterSet, SignalKind};
use crate::utils::{current_timestamp_micros, MonotonicTimeProvider, TimeProvider};

/// Parameter set of each kind, kept across runs
#[derive(Debug, Clone)]
struct ParameterSlots {
    ecg: Arc<ParameterSet>,
    emg: Arc<ParameterSet>,
    ppg: Arc<ParameterSet>,
}

impl ParameterSlots {
    fn defaults() -> Option<Self> {
        Some(Self {
            ecg: Arc::new(ParameterSet::defaults_for(SignalKind::Ecg)?),
            emg: Arc::new(ParameterSet::defaults_for(SignalKind::Emg)?),
            ppg: Arc::new(ParameterSet::defaults_for(SignalKind::Ppg)?),
        })
    }

    fn get(&self, kind: SignalKind) -> Option<&Arc<ParameterSet>> {
        match kind {
            SignalKind::Ecg => Some(&self.ecg),
            SignalKind::Emg => Some(&self.emg),
            SignalKind::Ppg => Some(&self.ppg),
            SignalKind::None => None,
        }
    }

    fn set(&mut self, params: ParameterSet) {
        let slot = match params.kind() {
            SignalKind::Ecg => &mut self.ecg,
            SignalKind::Emg => &mut self.emg,
            SignalKind::Ppg => &mut self.ppg,
            SignalKind::None => return,
        };
        *slot = Arc::new(params);
    }
}

struct ControlState {
    kind: SignalKind,
    state: SignalState,
    params: ParameterSlots,
    /// Incremented whenever a run starts or ends
    epoch: u64,
    timer: Box<dyn PeriodicTimer>,
}

/// Snapshot of the control state, returned by value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSnapshot {
    pub kind: SignalKind,
    pub state: SignalState,
    /// Parameters of the active kind
    pub parameters: Option<ParameterSet>,
    /// Samples generated in the current run
    pub sample_count: u64,
    pub timestamp_micros: u64,
    /// False when the control lock timed out and this is the last cached copy
    pub fresh: bool,
}

impl Default for SignalSnapshot {
    fn default() -> Self {
        Self {
            kind: SignalKind::None,
            state: SignalState::Stopped,
            parameters: None,
            sample_count: 0,
            timestamp_micros: 0,
            fresh: false,
        }
    }
}

/// State shared with the producer and monitor threads
pub(crate) struct EngineShared {
    pub(crate) config: SystemConfig,
    control: Mutex<ControlState>,
    generator: Mutex<Generator>,
    ring: Arc<SampleRing>,
    counters: Arc<PerformanceCounters>,
    sink: Arc<dyn AnalogOutput>,
    sample_count: AtomicU64,
    last_snapshot: Mutex<SignalSnapshot>,
}

impl EngineShared {
    fn lock_control(&self) -> SimResult<MutexGuard<'_, ControlState>> {
        self.control
            .try_lock_for(self.config.engine.lock_timeout())
            .ok_or(SimError::LockTimeout {
                timeout_ms: self.config.engine.lock_timeout_ms,
            })
    }

    /// One producer pass: generate a block if a run is active and a block fits
    pub(crate) fn produce_once(&self) -> ProducerStep {
        let (epoch, kind, params) = match self.control.try_lock_for(self.config.engine.lock_timeout()) {
            Some(ctl) if ctl.state == SignalState::Running => match ctl.params.get(ctl.kind) {
                Some(params) => (ctl.epoch, ctl.kind, Arc::clone(params)),
                None => return ProducerStep::Inactive,
            },
            Some(_) => return ProducerStep::Inactive,
            None => return ProducerStep::Idle,
        };

        let mut gen = self.generator.lock();
        if gen.epoch != epoch {
            return ProducerStep::Inactive;
        }

        let block = self.config.engine.block_size;
        if gen.free_space() < block {
            return ProducerStep::Idle;
        }

        gen.apply(&params);
        let written = gen.generate(kind, block);
        self.sample_count.fetch_add(written as u64, Ordering::Relaxed);
        ProducerStep::Generated(written)
    }

    /// Disable output and invalidate the current run. The caller sets the
    /// resulting state.
    fn halt(&self, ctl: &mut ControlState) {
        ctl.timer.disable();
        let mut gen = self.generator.lock();
        ctl.epoch += 1;
        gen.epoch = ctl.epoch;
        drop(gen);
        self.sink.write(DAC_MID_SCALE);
    }

    pub(crate) fn enter_error(&self, reason: &str) {
        match self.lock_control() {
            Ok(mut ctl) => {
                self.halt(&mut ctl);
                ctl.state = SignalState::Error;
                error!(reason, kind = ?ctl.kind, "engine entered error state");
            }
            Err(e) => error!(reason, error = %e, "could not record fault"),
        }
    }

    pub(crate) fn performance_stats(&self) -> PerformanceStats {
        PerformanceStats {
            samples_consumed: self.counters.consumed(),
            max_tick_nanos: self.counters.max_tick_nanos(),
            underruns: self.counters.underruns(),
            buffer_occupancy: self.ring.occupancy(),
            buffer_capacity: self.ring.capacity(),
            samples_generated: self.sample_count.load(Ordering::Relaxed),
        }
    }
}

fn check_transition(from: SignalState, to: SignalState) -> SimResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(SimError::InvalidTransition { from, to })
    }
}

/// Real-time signal engine.
///
/// All methods take `&self`; wrap the engine in an `Arc` to drive it from
/// several threads.
pub struct SignalEngine {
    shared: Arc<EngineShared>,
    producer_task: Option<BackgroundTask>,
    monitor_task: Option<BackgroundTask>,
}

impl SignalEngine {
    /// Build an engine around `timer` and `sink`. The timer is configured
    /// here and stays disabled until a signal starts.
    pub fn new(
        config: SystemConfig,
        timer: Box<dyn PeriodicTimer>,
        sink: Arc<dyn AnalogOutput>,
    ) -> SimResult<Self> {
        Self::with_clock(config, timer, sink, MonotonicTimeProvider::new())
    }

    /// As [`new`](Self::new), timing output ticks with `clock`
    pub fn with_clock<C: TimeProvider + 'static>(
        config: SystemConfig,
        mut timer: Box<dyn PeriodicTimer>,
        sink: Arc<dyn AnalogOutput>,
        clock: C,
    ) -> SimResult<Self> {
        config
            .validate()
            .map_err(|errors| SimError::Config(ConfigError::ValidationError(errors)))?;

        let (producer, consumer) =
            SampleRing::split(config.engine.buffer_capacity).map_err(|e| SimError::Resource {
                resource: "sample ring",
                reason: e.to_string(),
            })?;
        let ring = Arc::clone(producer.ring());
        let generator = Generator::new(&config, producer)?;
        let counters = Arc::new(PerformanceCounters::new());

        let driver = OutputDriver::with_clock(consumer, Arc::clone(&counters), Arc::clone(&sink), clock);
        timer.configure(config.engine.sample_period_micros(), driver.into_callback())?;
        timer.disable();
        sink.write(DAC_MID_SCALE);

        let params = ParameterSlots::defaults().ok_or(SimError::InvalidKind(SignalKind::None))?;
        let shared = Arc::new(EngineShared {
            control: Mutex::new(ControlState {
                kind: SignalKind::None,
                state: SignalState::Stopped,
                params,
                epoch: 0,
                timer,
            }),
            generator: Mutex::new(generator),
            ring,
            counters,
            sink,
            sample_count: AtomicU64::new(0),
            last_snapshot: Mutex::new(SignalSnapshot::default()),
            config,
        });

        let producer_task = if shared.config.producer.background {
            Some(producer::spawn(Arc::clone(&shared))?)
        } else {
            None
        };
        let monitor_task = if shared.config.monitor.enabled {
            Some(monitor::spawn(Arc::clone(&shared))?)
        } else {
            None
        };

        info!(
            sample_rate_hz = shared.config.engine.sample_rate_hz,
            capacity = shared.config.engine.buffer_capacity,
            block = shared.config.engine.block_size,
            background = producer_task.is_some(),
            "signal engine ready"
        );

        Ok(Self {
            shared,
            producer_task,
            monitor_task,
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.shared.config
    }

    /// Start `kind` with its stored parameters
    pub fn start(&self, kind: SignalKind) -> SimResult<()> {
        self.start_run(kind, None)
    }

    /// Store `params` for its kind and start that kind
    pub fn start_with(&self, params: ParameterSet) -> SimResult<()> {
        let params = params.validated()?;
        self.start_run(params.kind(), Some(params))
    }

    fn start_run(&self, kind: SignalKind, params: Option<ParameterSet>) -> SimResult<()> {
        if kind == SignalKind::None {
            return Err(SimError::InvalidKind(kind));
        }

        let shared = &*self.shared;
        let mut ctl = shared.lock_control()?;
        match ctl.state {
            SignalState::Error => {
                return Err(SimError::InvalidTransition {
                    from: SignalState::Error,
                    to: SignalState::Running,
                })
            }
            SignalState::Running | SignalState::Paused => {
                debug!(previous = ?ctl.kind, next = ?kind, "tearing down previous run");
                shared.halt(&mut ctl);
                ctl.state = SignalState::Stopped;
                ctl.kind = SignalKind::None;
            }
            SignalState::Stopped => {}
        }

        if let Some(params) = params {
            ctl.params.set(params);
        }
        let params = match ctl.params.get(kind) {
            Some(params) => Arc::clone(params),
            None => return Err(SimError::InvalidKind(kind)),
        };

        let seed = shared.config.engine.seed.unwrap_or_else(rand::random) ^ kind.seed_salt();
        let target = shared.config.engine.prefill_samples();

        let prefilled = {
            let mut gen = shared.generator.lock();
            gen.prepare(kind, &params, seed);
            ctl.epoch += 1;
            gen.epoch = ctl.epoch;
            gen.prefill(kind, target)
        };
        shared.sample_count.store(prefilled as u64, Ordering::Relaxed);

        if let Err(e) = ctl.timer.enable() {
            shared.halt(&mut ctl);
            warn!(error = %e, "output timer failed to start");
            return Err(e.into());
        }

        ctl.kind = kind;
        ctl.state = SignalState::Running;
        info!(kind = ?kind, seed, prefilled, "signal started");
        Ok(())
    }

    /// Stop output. No sample is written to the ring after this returns.
    pub fn stop(&self) -> SimResult<()> {
        let shared = &*self.shared;
        let mut ctl = shared.lock_control()?;
        match ctl.state {
            SignalState::Stopped => Ok(()),
            SignalState::Error => Err(SimError::InvalidTransition {
                from: SignalState::Error,
                to: SignalState::Stopped,
            }),
            SignalState::Running | SignalState::Paused => {
                shared.halt(&mut ctl);
                info!(kind = ?ctl.kind, "signal stopped");
                ctl.state = SignalState::Stopped;
                ctl.kind = SignalKind::None;
                Ok(())
            }
        }
    }

    /// Freeze output; the ring and its cursors keep their contents
    pub fn pause(&self) -> SimResult<()> {
        let mut ctl = self.shared.lock_control()?;
        if ctl.state == SignalState::Paused {
            return Ok(());
        }
        check_transition(ctl.state, SignalState::Paused)?;
        ctl.timer.disable();
        ctl.state = SignalState::Paused;
        debug!(kind = ?ctl.kind, "signal paused");
        Ok(())
    }

    pub fn resume(&self) -> SimResult<()> {
        let mut ctl = self.shared.lock_control()?;
        if ctl.state == SignalState::Running {
            return Ok(());
        }
        // a stopped engine has no run to continue; that takes `start`
        if ctl.state != SignalState::Paused {
            return Err(SimError::InvalidTransition {
                from: ctl.state,
                to: SignalState::Running,
            });
        }
        ctl.timer.enable()?;
        ctl.state = SignalState::Running;
        debug!(kind = ?ctl.kind, "signal resumed");
        Ok(())
    }

    /// Force the error state: output goes to mid-scale until
    /// [`reset_fault`](Self::reset_fault)
    pub fn report_fault(&self, reason: &str) -> SimResult<()> {
        let shared = &*self.shared;
        let mut ctl = shared.lock_control()?;
        shared.halt(&mut ctl);
        ctl.state = SignalState::Error;
        error!(reason, kind = ?ctl.kind, "fault reported");
        Ok(())
    }

    /// Leave the error state for `Stopped`
    pub fn reset_fault(&self) -> SimResult<()> {
        let mut ctl = self.shared.lock_control()?;
        if ctl.state == SignalState::Stopped {
            return Ok(());
        }
        // stopping a live run goes through `stop`
        if ctl.state != SignalState::Error {
            return Err(SimError::InvalidTransition {
                from: ctl.state,
                to: SignalState::Stopped,
            });
        }
        ctl.state = SignalState::Stopped;
        ctl.kind = SignalKind::None;
        info!("fault cleared");
        Ok(())
    }

    /// Replace the parameters of the active kind.
    ///
    /// Rejected without side effects unless `kind` is the active kind and
    /// `params` belongs to it.
    pub fn update_parameters(&self, kind: SignalKind, params: ParameterSet) -> SimResult<()> {
        if params.kind() != kind {
            return Err(SimError::KindMismatch {
                requested: params.kind(),
                active: kind,
            });
        }
        let params = params.validated()?;

        let mut ctl = self.shared.lock_control()?;
        if ctl.kind != kind || !ctl.state.is_active() {
            return Err(SimError::KindMismatch {
                requested: kind,
                active: ctl.kind,
            });
        }
        ctl.params.set(params);
        debug!(kind = ?kind, "parameters updated");
        Ok(())
    }

    /// Change only the noise level of the active kind
    pub fn update_noise_level(&self, level: f32) -> SimResult<()> {
        self.modify_active(|params| params.with_noise_level(level))
    }

    /// Change the primary amplitude of the active kind
    pub fn update_amplitude(&self, amplitude: f32) -> SimResult<()> {
        self.modify_active(|params| params.with_amplitude(amplitude))
    }

    fn modify_active(&self, change: impl FnOnce(ParameterSet) -> ParameterSet) -> SimResult<()> {
        let mut ctl = self.shared.lock_control()?;
        let current = match ctl.params.get(ctl.kind) {
            Some(params) if ctl.state.is_active() => **params,
            _ => return Err(SimError::InvalidKind(ctl.kind)),
        };
        ctl.params.set(change(current).validated()?);
        Ok(())
    }

    /// Stored parameters of `kind`, active or not
    pub fn parameters(&self, kind: SignalKind) -> SimResult<ParameterSet> {
        let ctl = self.shared.lock_control()?;
        ctl.params
            .get(kind)
            .map(|params| **params)
            .ok_or(SimError::InvalidKind(kind))
    }

    /// Snapshot under a bounded wait; on timeout the last snapshot is
    /// returned with `fresh == false`
    pub fn current_signal_data(&self) -> SignalSnapshot {
        let shared = &*self.shared;
        match shared.control.try_lock_for(shared.config.engine.lock_timeout()) {
            Some(ctl) => {
                let snapshot = SignalSnapshot {
                    kind: ctl.kind,
                    state: ctl.state,
                    parameters: ctl.params.get(ctl.kind).map(|params| **params),
                    sample_count: shared.sample_count.load(Ordering::Relaxed),
                    timestamp_micros: current_timestamp_micros(),
                    fresh: true,
                };
                drop(ctl);
                *shared.last_snapshot.lock() = snapshot.clone();
                snapshot
            }
            None => {
                warn!("control lock busy, returning cached snapshot");
                SignalSnapshot {
                    fresh: false,
                    ..shared.last_snapshot.lock().clone()
                }
            }
        }
    }

    pub fn state(&self) -> SignalState {
        self.current_signal_data().state
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        self.shared.performance_stats()
    }

    /// Diagnostics of the active model, `ModelMetrics::None` when idle or
    /// when the locks are busy
    pub fn model_metrics(&self) -> ModelMetrics {
        let shared = &*self.shared;
        let timeout = shared.config.engine.lock_timeout();
        let Some(ctl) = shared.control.try_lock_for(timeout) else {
            return ModelMetrics::None;
        };
        if !ctl.state.is_active() {
            return ModelMetrics::None;
        }
        match shared.generator.try_lock_for(timeout) {
            Some(gen) => gen.metrics(ctl.kind),
            None => ModelMetrics::None,
        }
    }

    /// Run one producer pass on the calling thread
    pub fn produce_once(&self) -> ProducerStep {
        self.shared.produce_once()
    }
}

impl Drop for SignalEngine {
    fn drop(&mut self) {
        if let Some(mut task) = self.producer_task.take() {
            task.shutdown();
        }
        if let Some(mut task) = self.monitor_task.take() {
            task.shutdown();
        }
        let mut ctl = self.shared.control.lock();
        ctl.timer.disable();
        self.shared.sink.write(DAC_MID_SCALE);
    }
}
