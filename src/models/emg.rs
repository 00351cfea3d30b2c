// src/models/emg.rs
//! Motor-unit pool EMG
//!
//! A fixed pool of units with exponentially spaced recruitment thresholds.
//! Recruited units discharge at a rate that grows with the excitation above
//! their threshold; each discharge launches a Ricker-shaped action potential
//! and the output is the sum of all potentials in flight.

use std::f32::consts::{PI, TAU};

use serde::Serialize;

use crate::config::constants::emg as k;
use crate::models::params::{EmgCondition, EmgParameters};
use crate::models::rng::GaussianSource;
use crate::models::WaveformModel;
use crate::processing::OutputRange;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MotorUnit {
    /// Excitation fraction the drive must exceed for recruitment
    threshold: f32,
    amplitude_mv: f32,
    firing_rate_hz: f32,
    until_discharge: f32,
    /// Time since the last discharge, infinite when none is in flight
    since_discharge: f32,
    recruited: bool,
    alive: bool,
}

impl MotorUnit {
    fn discharge(&mut self) {
        self.since_discharge = 0.0;
    }

    /// Ricker wavelet centred in the support window, cosine-tapered to
    /// zero at both ends
    #[inline]
    fn potential(&self, sigma: f32) -> f32 {
        if self.since_discharge >= k::MUAP_DURATION_S {
            return 0.0;
        }
        let half = 0.5 * k::MUAP_DURATION_S;
        let t = self.since_discharge - half;
        let ratio = t * t / (sigma * sigma);

        let from_edge = half - t.abs();
        let taper = if from_edge < k::MUAP_TAPER_S {
            0.5 * (1.0 - (PI * from_edge / k::MUAP_TAPER_S).cos())
        } else {
            1.0
        };
        -self.amplitude_mv * (1.0 - ratio) * (-0.5 * ratio).exp() * k::MUAP_SCALE * taper
    }
}

/// Live diagnostics of the motor-unit pool
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EmgMetrics {
    pub active_units: usize,
    pub mean_firing_rate_hz: f32,
    pub rms_mv: f32,
    pub fatigue: f32,
    /// Drive after force variability and tremor, 0..=1
    pub effective_excitation: f32,
}

#[derive(Debug, Clone)]
pub struct EmgModel {
    params: EmgParameters,
    rng: GaussianSource,
    units: Vec<MotorUnit>,

    until_recruitment: f32,
    effective_excitation: f32,
    fatigue: f32,
    tremor_hz: f32,
    /// Oscillator phases in radians, kept in `[0, TAU)`
    force_phase: f32,
    tremor_phase: f32,

    rms_window: [f32; k::RMS_WINDOW_SAMPLES],
    rms_index: usize,
    rms_sum: f32,
}

impl EmgModel {
    pub fn new(seed: u64) -> Self {
        let mut model = Self {
            params: EmgParameters::default(),
            rng: GaussianSource::new(seed),
            units: Vec::with_capacity(k::MOTOR_UNIT_COUNT),
            until_recruitment: 0.0,
            effective_excitation: 0.0,
            fatigue: 0.0,
            tremor_hz: k::TREMOR_MIN_HZ,
            force_phase: 0.0,
            tremor_phase: 0.0,
            rms_window: [0.0; k::RMS_WINDOW_SAMPLES],
            rms_index: 0,
            rms_sum: 0.0,
        };
        model.units.resize(
            k::MOTOR_UNIT_COUNT,
            MotorUnit {
                threshold: 0.0,
                amplitude_mv: 0.0,
                firing_rate_hz: k::MIN_FIRING_RATE_HZ,
                until_discharge: 0.0,
                since_discharge: f32::INFINITY,
                recruited: false,
                alive: true,
            },
        );
        model.reset();
        model
    }

    /// Recruitment threshold of unit `index` as an excitation fraction
    pub fn threshold(index: usize) -> f32 {
        let n = k::MOTOR_UNIT_COUNT as f32;
        let spread = k::THRESHOLD_SPREAD;
        ((spread.ln() * index as f32 / n).exp() - 1.0) / (spread - 1.0) * k::RECRUITMENT_RANGE
    }

    pub fn active_units(&self) -> usize {
        self.units.iter().filter(|u| u.recruited).count()
    }

    pub fn fatigue(&self) -> f32 {
        self.fatigue
    }

    pub fn rms(&self) -> f32 {
        (self.rms_sum.max(0.0) / k::RMS_WINDOW_SAMPLES as f32).sqrt()
    }

    fn muap_sigma(&self) -> f32 {
        if self.params.condition == EmgCondition::Myopathy {
            0.5 * k::MUAP_SIGMA_S
        } else {
            k::MUAP_SIGMA_S
        }
    }

    fn amplitude_factor(&self) -> f32 {
        match self.params.condition {
            EmgCondition::Myopathy => k::MYOPATHY_AMPLITUDE,
            EmgCondition::Neuropathy => k::NEUROPATHY_AMPLITUDE,
            _ => 1.0,
        }
    }

    fn draw_isi(&mut self, rate_hz: f32) -> f32 {
        let jitter = 1.0 + self.rng.gaussian(0.0, k::ISI_JITTER);
        (jitter / rate_hz.max(k::MIN_FIRING_RATE_HZ)).clamp(k::MIN_ISI_S, k::MAX_ISI_S)
    }

    fn update_recruitment(&mut self) {
        let drive = self.params.excitation_percent / 100.0;
        let variability = 1.0
            + k::FORCE_VARIATION_DEPTH * self.force_phase.sin()
            + self.rng.gaussian(0.0, k::FORCE_NOISE_STD);
        let tremor = if self.params.condition == EmgCondition::Tremor {
            1.0 + 0.5 * self.tremor_phase.sin()
        } else {
            1.0
        };
        let excitation = (drive * variability * tremor).clamp(0.0, 1.0);
        self.effective_excitation = excitation;

        let rate_scale = 1.0 - k::FATIGUE_RATE_DROP * self.fatigue;
        for i in 0..self.units.len() {
            let unit = self.units[i];
            let recruited = unit.alive && excitation > unit.threshold;
            let rate = (k::MIN_FIRING_RATE_HZ + k::FIRING_RATE_GAIN * (excitation - unit.threshold))
                .clamp(k::MIN_FIRING_RATE_HZ, k::MAX_FIRING_RATE_HZ)
                * rate_scale;

            let until_discharge = if recruited && !unit.recruited {
                // desynchronise newly recruited units
                self.rng.uniform() * self.draw_isi(rate)
            } else {
                unit.until_discharge
            };

            let unit = &mut self.units[i];
            unit.recruited = recruited;
            unit.firing_rate_hz = rate;
            unit.until_discharge = until_discharge;
        }
    }

    fn record_rms(&mut self, value: f32) {
        let old = self.rms_window[self.rms_index];
        self.rms_window[self.rms_index] = value;
        self.rms_sum += value * value - old * old;
        self.rms_index = (self.rms_index + 1) % k::RMS_WINDOW_SAMPLES;
        if self.rms_index == 0 {
            // refresh to bound accumulated rounding
            self.rms_sum = self.rms_window.iter().map(|v| v * v).sum();
        }
    }
}

impl WaveformModel for EmgModel {
    type Params = EmgParameters;
    type Metrics = EmgMetrics;

    fn reset(&mut self) {
        let amplitude_factor = self.amplitude_factor();
        let neuropathic = self.params.condition == EmgCondition::Neuropathy;
        let count = self.units.len();
        let span = k::MAX_UNIT_AMPLITUDE_MV / k::MIN_UNIT_AMPLITUDE_MV;

        for i in 0..count {
            let alive = !neuropathic || self.rng.chance(k::NEUROPATHY_SURVIVAL);
            let position = i as f32 / (count.max(2) - 1) as f32;
            self.units[i] = MotorUnit {
                threshold: Self::threshold(i),
                amplitude_mv: k::MIN_UNIT_AMPLITUDE_MV * span.powf(position) * amplitude_factor,
                firing_rate_hz: k::MIN_FIRING_RATE_HZ,
                until_discharge: 0.0,
                since_discharge: f32::INFINITY,
                recruited: false,
                alive,
            };
        }

        self.fatigue = 0.0;
        self.tremor_hz = self.rng.range(k::TREMOR_MIN_HZ, k::TREMOR_MAX_HZ);
        self.force_phase = self.rng.range(0.0, TAU);
        self.tremor_phase = 0.0;
        self.rms_window = [0.0; k::RMS_WINDOW_SAMPLES];
        self.rms_index = 0;
        self.rms_sum = 0.0;

        self.update_recruitment();
        self.until_recruitment = k::RECRUITMENT_UPDATE_INTERVAL_S;
    }

    fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    fn set_parameters(&mut self, params: &EmgParameters) {
        let next = params.clamped();
        let condition_changed = next.condition != self.params.condition;
        self.params = next;
        if condition_changed {
            self.reset();
        }
    }

    fn parameters(&self) -> &EmgParameters {
        &self.params
    }

    fn next_value(&mut self, dt: f32) -> f32 {
        self.force_phase = (self.force_phase + TAU * k::FORCE_VARIATION_HZ * dt) % TAU;
        self.tremor_phase = (self.tremor_phase + TAU * self.tremor_hz * dt) % TAU;
        if self.params.condition == EmgCondition::Fatigue && self.params.excitation_percent > 0.0 {
            self.fatigue = (self.fatigue + k::FATIGUE_RATE_PER_S * dt).min(k::FATIGUE_MAX);
        }

        self.until_recruitment -= dt;
        if self.until_recruitment <= 0.0 {
            self.until_recruitment += k::RECRUITMENT_UPDATE_INTERVAL_S;
            self.update_recruitment();
        }

        for i in 0..self.units.len() {
            if !self.units[i].recruited {
                continue;
            }
            self.units[i].until_discharge -= dt;
            if self.units[i].until_discharge <= 0.0 {
                let isi = self.draw_isi(self.units[i].firing_rate_hz);
                let unit = &mut self.units[i];
                unit.discharge();
                unit.until_discharge = (unit.until_discharge + isi).max(dt);
            }
        }

        if self.params.condition == EmgCondition::Fasciculation
            && self.rng.chance(k::FASCICULATION_RATE_HZ * dt)
        {
            let index = self.rng.range_inclusive(0, self.units.len() as u32 - 1) as usize;
            self.units[index].discharge();
        }

        let sigma = self.muap_sigma();
        let mut sum = 0.0;
        for unit in self.units.iter_mut() {
            sum += unit.potential(sigma);
            unit.since_discharge += dt;
        }

        let fatigue_gain = 1.0 + k::FATIGUE_AMPLITUDE_GAIN * self.fatigue;
        let noise = self.rng.gaussian(0.0, self.params.noise_level * k::NOISE_SCALE_MV);
        let value = self.params.amplitude * fatigue_gain * sum + noise;
        let value = if value.is_finite() { value } else { 0.0 };
        self.record_rms(value);
        value
    }

    fn output_range(&self) -> OutputRange {
        OutputRange::symmetric(k::OUTPUT_RANGE_MV)
    }

    fn metrics(&self) -> EmgMetrics {
        let (active, rate_sum) = self
            .units
            .iter()
            .filter(|u| u.recruited)
            .fold((0usize, 0.0f32), |(n, sum), u| (n + 1, sum + u.firing_rate_hz));

        EmgMetrics {
            active_units: active,
            mean_firing_rate_hz: if active > 0 { rate_sum / active as f32 } else { 0.0 },
            rms_mv: self.rms(),
            fatigue: self.fatigue,
            effective_excitation: self.effective_excitation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.001;

    fn at(excitation_percent: f32, condition: EmgCondition) -> EmgParameters {
        EmgParameters {
            excitation_percent,
            noise_level: 0.0,
            ..EmgParameters::for_condition(condition)
        }
    }

    #[test]
    fn test_thresholds_increase_and_stay_below_range() {
        let mut previous = -1.0;
        for i in 0..k::MOTOR_UNIT_COUNT {
            let t = EmgModel::threshold(i);
            assert!(t > previous);
            assert!(t < k::RECRUITMENT_RANGE);
            previous = t;
        }
        assert_eq!(EmgModel::threshold(0), 0.0);
    }

    #[test]
    fn test_potential_starts_and_ends_at_zero() {
        let mut unit = MotorUnit {
            threshold: 0.0,
            amplitude_mv: 1.0,
            firing_rate_hz: k::MIN_FIRING_RATE_HZ,
            until_discharge: 0.0,
            since_discharge: 0.0,
            recruited: true,
            alive: true,
        };
        let peak = k::MUAP_SCALE;

        assert!(unit.potential(k::MUAP_SIGMA_S).abs() < 1.0e-6);
        unit.since_discharge = 0.5 * k::MUAP_DURATION_S;
        assert!((unit.potential(k::MUAP_SIGMA_S) + peak).abs() < 1.0e-6);

        // continuous across the whole window, including both edges
        let fine = 1.0e-5;
        let mut previous = 0.0;
        for i in 0..=((k::MUAP_DURATION_S + DT) / fine) as usize {
            let t = i as f32 * fine;
            unit.since_discharge = t;
            let v = unit.potential(k::MUAP_SIGMA_S);
            assert!((v - previous).abs() < 0.01 * peak, "jump {} at {} s", v - previous, t);
            previous = v;
        }
    }

    #[test]
    fn test_rest_is_silent() {
        let mut model = EmgModel::new(1);
        model.set_parameters(&at(0.0, EmgCondition::Rest));
        for _ in 0..2000 {
            assert_eq!(model.next_value(DT), 0.0);
        }
        assert_eq!(model.active_units(), 0);
    }

    #[test]
    fn test_full_excitation_recruits_whole_pool_within_one_interval() {
        let mut model = EmgModel::new(2);
        model.set_parameters(&at(100.0, EmgCondition::HighContraction));
        let steps = (k::RECRUITMENT_UPDATE_INTERVAL_S / DT).ceil() as usize;
        for _ in 0..steps {
            model.next_value(DT);
        }
        assert_eq!(model.active_units(), k::MOTOR_UNIT_COUNT);
    }

    #[test]
    fn test_firing_rates_within_physiological_band() {
        let mut model = EmgModel::new(3);
        model.set_parameters(&at(80.0, EmgCondition::HighContraction));
        for _ in 0..500 {
            model.next_value(DT);
        }
        let metrics = model.metrics();
        assert!(metrics.mean_firing_rate_hz >= k::MIN_FIRING_RATE_HZ);
        assert!(metrics.mean_firing_rate_hz <= k::MAX_FIRING_RATE_HZ);
        assert!(metrics.rms_mv > 0.0);
    }

    #[test]
    fn test_myopathy_is_smaller_than_neuropathy() {
        fn rms_after(condition: EmgCondition) -> f32 {
            let mut model = EmgModel::new(11);
            model.set_parameters(&at(50.0, condition));
            let mut sum = 0.0;
            let n = 4000;
            for _ in 0..n {
                let v = model.next_value(DT);
                sum += v * v;
            }
            (sum / n as f32).sqrt()
        }
        assert!(rms_after(EmgCondition::Myopathy) < rms_after(EmgCondition::Neuropathy));
    }

    #[test]
    fn test_fatigue_accumulates_and_saturates() {
        let mut model = EmgModel::new(4);
        model.set_parameters(&at(60.0, EmgCondition::Fatigue));
        for _ in 0..10_000 {
            model.next_value(DT);
        }
        assert!((model.fatigue() - 0.1).abs() < 0.01);

        for _ in 0..100_000 {
            model.next_value(DT);
        }
        assert_eq!(model.fatigue(), k::FATIGUE_MAX);
    }

    #[test]
    fn test_modulation_keeps_running_on_long_runs() {
        let mut model = EmgModel::new(6);
        model.set_parameters(&at(40.0, EmgCondition::Tremor));
        let force_step = TAU * k::FORCE_VARIATION_HZ * DT;
        let tremor_step = TAU * model.tremor_hz * DT;

        // both oscillators half a step before wrapping
        model.force_phase = TAU - 0.5 * force_step;
        model.tremor_phase = TAU - 0.5 * tremor_step;

        let (mut force, mut tremor) = (model.force_phase, model.tremor_phase);
        let (mut lo, mut hi) = (f32::MAX, f32::MIN);
        for _ in 0..1000 {
            model.next_value(DT);
            assert!(((model.force_phase - force).rem_euclid(TAU) - force_step).abs() < 1.0e-4);
            assert!(((model.tremor_phase - tremor).rem_euclid(TAU) - tremor_step).abs() < 1.0e-4);
            assert!(model.force_phase < TAU && model.tremor_phase < TAU);
            force = model.force_phase;
            tremor = model.tremor_phase;

            let excitation = model.metrics().effective_excitation;
            lo = lo.min(excitation);
            hi = hi.max(excitation);
        }
        // a 4-6 Hz tremor swings the drive by half within one second
        assert!(hi - lo > 0.2, "excitation range {}..{}", lo, hi);
    }

    #[test]
    fn test_fasciculation_fires_at_rest() {
        let mut model = EmgModel::new(5);
        model.set_parameters(&at(0.0, EmgCondition::Fasciculation));
        let nonzero = (0..5000).filter(|_| model.next_value(DT) != 0.0).count();
        assert!(nonzero > 0);
        assert_eq!(model.active_units(), 0);
    }
}
