// src/models/ppg.rs
//! Photoplethysmograph pulse model
//!
//! Each beat is a normalised shape in beat phase `[0, 1)`: a systolic and a
//! diastolic Gaussian with a subtracted dicrotic-notch Gaussian between them.
//! Perfusion index sets the pulsatile amplitude, saturation shifts the DC
//! level, and one respiratory oscillation modulates amplitude and baseline.

use std::f32::consts::TAU;

use serde::Serialize;

use crate::config::constants::ppg as k;
use crate::models::hrv::{RrGenerator, RrSettings};
use crate::models::limits;
use crate::models::params::{PpgCondition, PpgParameters};
use crate::models::rng::GaussianSource;
use crate::models::WaveformModel;
use crate::processing::OutputRange;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PpgMetrics {
    pub beat_count: u64,
    pub heart_rate_bpm: f32,
    pub last_rr_s: f32,
    /// Position inside the current beat, 0..1
    pub beat_phase: f32,
    /// Perfusion index of the current beat after variation
    pub perfusion_index: f32,
    pub premature: bool,
}

#[derive(Debug, Clone)]
pub struct PpgModel {
    params: PpgParameters,
    pending: Option<PpgParameters>,
    rng: GaussianSource,
    hrv: RrGenerator,

    phase: f32,
    rr: f32,
    beat_count: u64,
    beat_pi: f32,
    premature: bool,

    /// Respiratory oscillation, radians in `[0, TAU)`
    respiration_phase: f32,
    respiration_hz: f32,
    respiration_depth: f32,
    wander_phase: f32,
}

impl PpgModel {
    pub fn new(seed: u64) -> Self {
        let params = PpgParameters::default();
        let mut model = Self {
            params,
            pending: None,
            rng: GaussianSource::new(seed),
            hrv: RrGenerator::new(rr_settings(&params)),
            phase: 0.0,
            rr: 60.0 / params.heart_rate_bpm,
            beat_count: 0,
            beat_pi: params.perfusion_index,
            premature: false,
            respiration_phase: 0.0,
            respiration_hz: k::RESPIRATION_MIN_HZ,
            respiration_depth: k::RESPIRATION_MIN_DEPTH,
            wander_phase: 0.0,
        };
        model.reset();
        model
    }

    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    pub fn current_rr(&self) -> f32 {
        self.rr
    }

    pub fn beat_phase(&self) -> f32 {
        self.phase
    }

    /// Pulsatile amplitude in mV for a perfusion index
    pub fn ac_amplitude(perfusion_index: f32) -> f32 {
        perfusion_index * k::AC_SCALE_MV_PER_PI
    }

    /// Normalised pulse shape at beat phase `phase`, in `[0, 1]`
    pub fn pulse_shape(phase: f32, notch_depth: f32, diastolic_ratio: f32) -> f32 {
        let gaussian = |centre: f32, width: f32| {
            let d = (phase - centre) / width;
            (-0.5 * d * d).exp()
        };
        let systolic = gaussian(k::SYSTOLIC_POSITION, k::SYSTOLIC_WIDTH);
        let diastolic = diastolic_ratio * gaussian(k::DIASTOLIC_POSITION, k::DIASTOLIC_WIDTH);
        let notch = notch_depth * gaussian(k::NOTCH_POSITION, k::NOTCH_WIDTH);

        ((systolic + diastolic - notch) / k::SHAPE_NORMALIZATION).clamp(0.0, 1.0)
    }

    fn begin_beat(&mut self) {
        if let Some(next) = self.pending.take() {
            self.params = next;
            self.hrv.update(rr_settings(&next));
        }

        let limits = limits::ppg(self.params.condition);
        let mut rr = self.hrv.next_rr(&mut self.rng);
        self.premature = self.params.condition == PpgCondition::Arrhythmia
            && self.rng.chance(k::ARRHYTHMIA_PREMATURE_PROBABILITY);
        if self.premature {
            rr = self.hrv.clip(rr * k::ARRHYTHMIA_PREMATURE_FACTOR);
        }

        self.rr = rr.clamp(k::MIN_RR_S, k::MAX_RR_S);
        let variation = 1.0 + self.rng.gaussian(0.0, limits.pi_variation);
        self.beat_pi = (self.params.perfusion_index * variation).max(0.0);
        self.beat_count += 1;
    }
}

impl WaveformModel for PpgModel {
    type Params = PpgParameters;
    type Metrics = PpgMetrics;

    fn reset(&mut self) {
        if let Some(next) = self.pending.take() {
            self.params = next;
        }
        self.hrv = RrGenerator::new(rr_settings(&self.params));
        self.hrv.reset(&mut self.rng);

        self.phase = 0.0;
        self.respiration_phase = 0.0;
        self.beat_count = 0;
        self.respiration_hz = self.rng.range(k::RESPIRATION_MIN_HZ, k::RESPIRATION_MAX_HZ);
        self.respiration_depth = self.rng.range(k::RESPIRATION_MIN_DEPTH, k::RESPIRATION_MAX_DEPTH);
        self.wander_phase = self.rng.range(0.0, TAU);
        self.begin_beat();
    }

    fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    fn set_parameters(&mut self, params: &PpgParameters) {
        let next = params.clamped();
        if next.condition != self.params.condition {
            self.params = next;
            self.reset();
        } else {
            self.pending = Some(next);
        }
    }

    fn parameters(&self) -> &PpgParameters {
        self.pending.as_ref().unwrap_or(&self.params)
    }

    fn next_value(&mut self, dt: f32) -> f32 {
        self.respiration_phase = (self.respiration_phase + TAU * self.respiration_hz * dt) % TAU;
        self.phase += dt / self.rr;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            self.begin_beat();
        }

        let limits = limits::ppg(self.params.condition);
        let shape = Self::pulse_shape(self.phase, self.params.dicrotic_notch, limits.diastolic_ratio);

        let respiration = self.respiration_phase.sin();
        let ac = Self::ac_amplitude(self.beat_pi) * (1.0 + self.respiration_depth * respiration);
        let wander = k::BASELINE_WANDER
            * Self::ac_amplitude(self.params.perfusion_index)
            * (self.respiration_phase + self.wander_phase).sin();
        let dc = (self.params.spo2_percent - k::SPO2_REFERENCE) * k::SPO2_DC_SLOPE_MV;
        let noise = self.rng.gaussian(0.0, self.params.noise_level * k::NOISE_SCALE_MV);

        let value = ac * shape + wander + dc + noise;
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    fn output_range(&self) -> OutputRange {
        OutputRange::new(k::OUTPUT_MIN_MV, k::OUTPUT_MAX_MV)
    }

    fn metrics(&self) -> PpgMetrics {
        PpgMetrics {
            beat_count: self.beat_count,
            heart_rate_bpm: 60.0 / self.rr.max(f32::EPSILON),
            last_rr_s: self.rr,
            beat_phase: self.phase,
            perfusion_index: self.beat_pi,
            premature: self.premature,
        }
    }
}

fn rr_settings(params: &PpgParameters) -> RrSettings {
    let limits = limits::ppg(params.condition);
    let bound_fraction = if params.condition == PpgCondition::Arrhythmia { 0.5 } else { 0.25 };
    RrSettings {
        mean_rr: 60.0 / params.heart_rate_bpm.max(1.0),
        std_fraction: limits.hrv_std,
        bound_fraction,
        absolute_min: k::MIN_RR_S,
        absolute_max: k::MAX_RR_S,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.001;

    fn quiet(condition: PpgCondition) -> PpgParameters {
        PpgParameters {
            noise_level: 0.0,
            ..PpgParameters::for_condition(condition)
        }
    }

    #[test]
    fn test_shape_peaks_at_systole_with_notch_dip() {
        let at = |phase: f32| PpgModel::pulse_shape(phase, 0.3, 0.4);
        let systolic = at(k::SYSTOLIC_POSITION);
        assert!(systolic > at(k::NOTCH_POSITION));
        assert!(at(k::NOTCH_POSITION) < at(k::DIASTOLIC_POSITION));
        assert!(at(0.95) < 0.05);
        for i in 0..100 {
            let v = at(i as f32 / 100.0);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_pulse_amplitude_tracks_perfusion() {
        fn swing(condition: PpgCondition) -> f32 {
            let mut model = PpgModel::new(7);
            model.set_parameters(&quiet(condition));
            let (mut lo, mut hi) = (f32::MAX, f32::MIN);
            for _ in 0..5000 {
                let v = model.next_value(DT);
                lo = lo.min(v);
                hi = hi.max(v);
            }
            hi - lo
        }
        assert!(swing(PpgCondition::StrongPerfusion) > 5.0 * swing(PpgCondition::WeakPerfusion));
    }

    #[test]
    fn test_low_saturation_shifts_baseline_down() {
        let mut model = PpgModel::new(8);
        model.set_parameters(&quiet(PpgCondition::LowSpO2));
        let mean: f32 = (0..4000).map(|_| model.next_value(DT)).sum::<f32>() / 4000.0;

        let mut normal = PpgModel::new(8);
        normal.set_parameters(&quiet(PpgCondition::Normal));
        let normal_mean: f32 = (0..4000).map(|_| normal.next_value(DT)).sum::<f32>() / 4000.0;

        assert!(mean < normal_mean);
    }

    #[test]
    fn test_beats_follow_heart_rate() {
        let mut model = PpgModel::new(9);
        model.set_parameters(&PpgParameters { heart_rate_bpm: 60.0, ..quiet(PpgCondition::Normal) });
        model.reset();
        for _ in 0..60_000 {
            model.next_value(DT);
        }
        let beats = model.beat_count();
        assert!((55..=66).contains(&beats), "{} beats in 60 s", beats);
    }

    #[test]
    fn test_arrhythmia_has_premature_beats() {
        let mut model = PpgModel::new(10);
        model.set_parameters(&quiet(PpgCondition::Arrhythmia));
        let mut premature = 0;
        let mut beat = model.beat_count();
        for _ in 0..60_000 {
            model.next_value(DT);
            if model.beat_count() != beat {
                beat = model.beat_count();
                if model.metrics().premature {
                    premature += 1;
                }
                let rr = model.current_rr();
                assert!((k::MIN_RR_S..=k::MAX_RR_S).contains(&rr));
            }
        }
        assert!(premature > 3);
    }

    #[test]
    fn test_respiration_keeps_turning_on_long_runs() {
        let mut model = PpgModel::new(12);
        model.set_parameters(&quiet(PpgCondition::Normal));
        let step = TAU * model.respiration_hz * DT;

        // one step short of a full turn, as after hours of output
        model.respiration_phase = TAU - 0.5 * step;
        let mut previous = model.respiration_phase;
        for _ in 0..1000 {
            model.next_value(DT);
            let phase = model.respiration_phase;
            assert!((0.0..TAU).contains(&phase), "phase {}", phase);
            let advanced = (phase - previous).rem_euclid(TAU);
            assert!((advanced - step).abs() < 1.0e-4, "advanced {} expected {}", advanced, step);
            previous = phase;
        }
    }

    #[test]
    fn test_parameter_change_waits_for_beat() {
        let mut model = PpgModel::new(11);
        model.set_parameters(&quiet(PpgCondition::Normal));
        let beat = model.beat_count();
        model.set_parameters(&PpgParameters { perfusion_index: 5.0, ..quiet(PpgCondition::Normal) });
        assert!(model.metrics().perfusion_index < 4.5);
        while model.beat_count() == beat {
            model.next_value(DT);
        }
        assert!(model.metrics().perfusion_index > 4.0);
    }
}
