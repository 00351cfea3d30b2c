// src/models/mod.rs
//! Physiological waveform models
//!
//! Each model advances by one output period per call and returns a value in
//! millivolts; quantisation to DAC codes happens through [`OutputRange`].

pub mod ecg;
pub mod emg;
pub mod hrv;
pub mod limits;
pub mod params;
pub mod ppg;
pub mod rng;

pub use ecg::{BeatKind, EcgMetrics, EcgModel};
pub use emg::{EmgMetrics, EmgModel};
pub use params::{
    EcgCondition, EcgLead, EcgParameters, EmgCondition, EmgParameters, ParameterSet, PpgCondition,
    PpgParameters, SignalKind,
};
pub use ppg::{PpgMetrics, PpgModel};

use serde::Serialize;

use crate::hal::DacSample;
use crate::processing::OutputRange;

/// Common contract of the three generators
pub trait WaveformModel: Send {
    type Params;
    type Metrics;

    /// Clear phase and history, re-deriving internal state from the current
    /// parameters. Draws from the model's own random source.
    fn reset(&mut self);

    /// Restart the random sequence; pair with [`reset`](Self::reset) for a
    /// reproducible run.
    fn reseed(&mut self, seed: u64);

    /// A condition change resets the model. Otherwise beat-based models defer
    /// the change to the next beat boundary.
    fn set_parameters(&mut self, params: &Self::Params);

    /// Most recently requested parameters, pending or applied
    fn parameters(&self) -> &Self::Params;

    /// Advance by `dt` seconds and return the raw value in mV
    fn next_value(&mut self, dt: f32) -> f32;

    fn output_range(&self) -> OutputRange;

    fn metrics(&self) -> Self::Metrics;

    /// Advance by `dt` and quantise to a DAC code
    #[inline]
    fn next_sample(&mut self, dt: f32) -> DacSample {
        let value = self.next_value(dt);
        self.output_range().quantize(value)
    }
}

/// Diagnostics of whichever model is active
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelMetrics {
    None,
    Ecg(EcgMetrics),
    Emg(EmgMetrics),
    Ppg(PpgMetrics),
}

impl ModelMetrics {
    pub fn kind(&self) -> SignalKind {
        match self {
            ModelMetrics::None => SignalKind::None,
            ModelMetrics::Ecg(_) => SignalKind::Ecg,
            ModelMetrics::Emg(_) => SignalKind::Emg,
            ModelMetrics::Ppg(_) => SignalKind::Ppg,
        }
    }
}
