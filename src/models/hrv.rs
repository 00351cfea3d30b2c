// src/models/hrv.rs
//! Beat-interval generator with heart-rate variability
//!
//! RR = mean + LF oscillation + HF oscillation + Gaussian jitter, sampled once
//! per beat at the beat's onset time and clipped to a band around the mean.
//! The ECG and PPG models each own an instance.

use std::f32::consts::TAU;

use crate::config::constants::ecg::{HF_CENTER_HZ, HRV_CENTER_SPREAD_HZ, LF_CENTER_HZ, LF_HF_RATIO};
use crate::models::rng::GaussianSource;

/// Share of RR variance carried by the two oscillations, the rest is jitter
const OSCILLATORY_SHARE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrSettings {
    pub mean_rr: f32,
    /// RR standard deviation as a fraction of `mean_rr`
    pub std_fraction: f32,
    /// Clip band half-width as a fraction of `mean_rr`
    pub bound_fraction: f32,
    pub absolute_min: f32,
    pub absolute_max: f32,
}

#[derive(Debug, Clone)]
pub struct RrGenerator {
    settings: RrSettings,
    lf_hz: f32,
    hf_hz: f32,
    lf_phase: f32,
    hf_phase: f32,
    lf_amplitude: f32,
    hf_amplitude: f32,
    jitter_std: f32,
    min_rr: f32,
    max_rr: f32,
    last_rr: f32,
}

impl RrGenerator {
    pub fn new(settings: RrSettings) -> Self {
        let mut generator = Self {
            settings,
            lf_hz: LF_CENTER_HZ,
            hf_hz: HF_CENTER_HZ,
            lf_phase: 0.0,
            hf_phase: 0.0,
            lf_amplitude: 0.0,
            hf_amplitude: 0.0,
            jitter_std: 0.0,
            min_rr: settings.mean_rr,
            max_rr: settings.mean_rr,
            last_rr: settings.mean_rr,
        };
        generator.derive();
        generator
    }

    /// Draw fresh oscillator frequencies and phases, keeping the settings
    pub fn reset(&mut self, rng: &mut GaussianSource) {
        self.lf_hz = rng.range(LF_CENTER_HZ - HRV_CENTER_SPREAD_HZ, LF_CENTER_HZ + HRV_CENTER_SPREAD_HZ);
        self.hf_hz = rng.range(HF_CENTER_HZ - HRV_CENTER_SPREAD_HZ, HF_CENTER_HZ + HRV_CENTER_SPREAD_HZ);
        self.lf_phase = rng.range(0.0, TAU);
        self.hf_phase = rng.range(0.0, TAU);
        self.last_rr = self.settings.mean_rr;
    }

    /// Change mean/spread without disturbing the oscillator phases
    pub fn update(&mut self, settings: RrSettings) {
        self.settings = settings;
        self.derive();
    }

    fn derive(&mut self) {
        let s = &self.settings;
        let variance = (s.std_fraction * s.mean_rr).powi(2);
        let oscillatory = variance * OSCILLATORY_SHARE;

        self.lf_amplitude = (2.0 * oscillatory * LF_HF_RATIO / (1.0 + LF_HF_RATIO)).sqrt();
        self.hf_amplitude = (2.0 * oscillatory / (1.0 + LF_HF_RATIO)).sqrt();
        self.jitter_std = (variance * (1.0 - OSCILLATORY_SHARE)).sqrt();

        let low = s.mean_rr * (1.0 - s.bound_fraction);
        let high = s.mean_rr * (1.0 + s.bound_fraction);
        self.min_rr = low.max(s.absolute_min).min(s.mean_rr);
        self.max_rr = high.min(s.absolute_max).max(s.mean_rr);
    }

    /// Next beat interval in seconds
    pub fn next_rr(&mut self, rng: &mut GaussianSource) -> f32 {
        let raw = self.settings.mean_rr
            + self.lf_amplitude * self.lf_phase.sin()
            + self.hf_amplitude * self.hf_phase.sin()
            + rng.gaussian(0.0, self.jitter_std);
        let rr = self.clip(raw);

        self.lf_phase = (self.lf_phase + TAU * self.lf_hz * rr) % TAU;
        self.hf_phase = (self.hf_phase + TAU * self.hf_hz * rr) % TAU;
        self.last_rr = rr;
        rr
    }

    /// Clip an externally modified interval (ectopic beats, pauses) into
    /// the allowed band
    #[inline]
    pub fn clip(&self, rr: f32) -> f32 {
        if rr.is_finite() {
            rr.clamp(self.min_rr, self.max_rr)
        } else {
            self.settings.mean_rr
        }
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min_rr, self.max_rr)
    }

    pub fn last_rr(&self) -> f32 {
        self.last_rr
    }

    pub fn mean_rr(&self) -> f32 {
        self.settings.mean_rr
    }
}
