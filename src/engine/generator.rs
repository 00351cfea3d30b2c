// src/engine/generator.rs
//! Model evaluation, filtering and quantisation into the ring

use std::sync::Arc;

use crate::buffer::{RingProducer, SampleRing};
use crate::config::SystemConfig;
use crate::error::SimResult;
use crate::hal::{DacSample, DAC_MID_SCALE};
use crate::models::{
    EcgModel, EmgModel, ModelMetrics, ParameterSet, PpgModel, SignalKind, WaveformModel,
};
use crate::processing::FilterChain;

/// Everything the producer mutates, guarded by one lock.
///
/// Models and chains for all kinds exist for the engine's lifetime and are
/// re-initialised, not rebuilt, on every start.
pub(crate) struct Generator {
    ecg: EcgModel,
    emg: EmgModel,
    ppg: PpgModel,
    ecg_chain: FilterChain,
    emg_chain: FilterChain,
    ppg_chain: FilterChain,
    producer: RingProducer,
    block: Vec<DacSample>,
    applied: Option<Arc<ParameterSet>>,
    dt: f32,
    /// Run this generator belongs to; stale producers compare against it
    pub(crate) epoch: u64,
}

impl Generator {
    pub(crate) fn new(config: &SystemConfig, producer: RingProducer) -> SimResult<Self> {
        let rate = config.engine.sample_rate_hz as f32;
        let filters = &config.filters;
        let seed = config.engine.seed.unwrap_or(0);

        Ok(Self {
            ecg: EcgModel::new(seed ^ SignalKind::Ecg.seed_salt()),
            emg: EmgModel::new(seed ^ SignalKind::Emg.seed_salt()),
            ppg: PpgModel::new(seed ^ SignalKind::Ppg.seed_salt()),
            ecg_chain: FilterChain::for_kind(SignalKind::Ecg, filters, rate)?,
            emg_chain: FilterChain::for_kind(SignalKind::Emg, filters, rate)?,
            ppg_chain: FilterChain::for_kind(SignalKind::Ppg, filters, rate)?,
            producer,
            block: vec![DAC_MID_SCALE; config.engine.block_size],
            applied: None,
            dt: config.engine.dt(),
            epoch: 0,
        })
    }

    pub(crate) fn ring(&self) -> &Arc<SampleRing> {
        self.producer.ring()
    }

    pub(crate) fn free_space(&self) -> usize {
        self.producer.free_space()
    }

    /// Re-initialise the ring, model and chain of `kind` for a new run.
    ///
    /// The resulting state depends only on `params` and `seed`. The output
    /// timer must be disabled while this runs.
    pub(crate) fn prepare(&mut self, kind: SignalKind, params: &Arc<ParameterSet>, seed: u64) {
        self.ring().reset();
        self.applied = None;
        self.apply(params);

        match kind {
            SignalKind::Ecg => {
                self.ecg.reseed(seed);
                self.ecg.reset();
                self.ecg_chain.reset();
            }
            SignalKind::Emg => {
                self.emg.reseed(seed);
                self.emg.reset();
                self.emg_chain.reset();
            }
            SignalKind::Ppg => {
                self.ppg.reseed(seed);
                self.ppg.reset();
                self.ppg_chain.reset();
            }
            SignalKind::None => {}
        }
    }

    /// Hand a new parameter set to its model, once per distinct set.
    ///
    /// A condition change restarts the model, so its chain is cleared too.
    pub(crate) fn apply(&mut self, params: &Arc<ParameterSet>) {
        if let Some(applied) = &self.applied {
            if Arc::ptr_eq(applied, params) {
                return;
            }
        }
        match params.as_ref() {
            ParameterSet::Ecg(p) => {
                let changed = self.ecg.parameters().condition != p.condition;
                self.ecg.set_parameters(p);
                if changed {
                    self.ecg_chain.reset();
                }
            }
            ParameterSet::Emg(p) => {
                let changed = self.emg.parameters().condition != p.condition;
                self.emg.set_parameters(p);
                if changed {
                    self.emg_chain.reset();
                }
            }
            ParameterSet::Ppg(p) => {
                let changed = self.ppg.parameters().condition != p.condition;
                self.ppg.set_parameters(p);
                if changed {
                    self.ppg_chain.reset();
                }
            }
        }
        self.applied = Some(Arc::clone(params));
    }

    #[inline]
    fn render(&mut self, kind: SignalKind) -> DacSample {
        let dt = self.dt;
        match kind {
            SignalKind::Ecg => {
                let value = self.ecg_chain.process_sample(self.ecg.next_value(dt));
                self.ecg.output_range().quantize(value)
            }
            SignalKind::Emg => {
                let value = self.emg_chain.process_sample(self.emg.next_value(dt));
                self.emg.output_range().quantize(value)
            }
            SignalKind::Ppg => {
                let value = self.ppg_chain.process_sample(self.ppg.next_value(dt));
                self.ppg.output_range().quantize(value)
            }
            SignalKind::None => DAC_MID_SCALE,
        }
    }

    /// Generate up to one block and push it; returns the samples written
    pub(crate) fn generate(&mut self, kind: SignalKind, count: usize) -> usize {
        let count = count.min(self.block.len()).min(self.free_space());
        for i in 0..count {
            let sample = self.render(kind);
            self.block[i] = sample;
        }
        self.producer.push_slice(&self.block[..count])
    }

    /// Fill the ring up to `target` samples
    pub(crate) fn prefill(&mut self, kind: SignalKind, target: usize) -> usize {
        let block = self.block.len();
        let mut written = 0;
        while written < target {
            let pushed = self.generate(kind, block.min(target - written));
            if pushed == 0 {
                break;
            }
            written += pushed;
        }
        written
    }

    pub(crate) fn metrics(&self, kind: SignalKind) -> ModelMetrics {
        match kind {
            SignalKind::Ecg => ModelMetrics::Ecg(self.ecg.metrics()),
            SignalKind::Emg => ModelMetrics::Emg(self.emg.metrics()),
            SignalKind::Ppg => ModelMetrics::Ppg(self.ppg.metrics()),
            SignalKind::None => ModelMetrics::None,
        }
    }
}
