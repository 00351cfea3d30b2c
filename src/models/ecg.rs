// src/models/ecg.rs
//! Cardiac oscillator (limit cycle plus Gaussian event kernels)
//!
//! State `(x, y)` circles a unit limit cycle at `ω = 2π / RR`; `z` is driven
//! by five Gaussian kernels in angle (P, Q, R, S, T) and relaxes toward the
//! baseline. Integration is fixed-step RK4 with sub-steps of at most 1 ms.
//!
//! A beat boundary is the wrap of the angle from `+π` to `-π`, in the
//! isoelectric TP segment. RR, per-beat morphology jitter, ectopic decisions
//! and pending parameter changes are all applied there.

use std::f32::consts::{PI, TAU};

use serde::Serialize;

use crate::config::constants::ecg as k;
use crate::models::hrv::{RrGenerator, RrSettings};
use crate::models::limits;
use crate::models::params::{EcgCondition, EcgParameters};
use crate::models::rng::GaussianSource;
use crate::models::WaveformModel;
use crate::processing::OutputRange;

const MAX_STEP_S: f32 = 0.001;
const P: usize = 0;
const Q: usize = 1;
const R: usize = 2;
const S: usize = 3;
const T: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Kernel {
    angle: f32,
    amplitude: f32,
    width: f32,
}

/// Role of the beat currently being drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatKind {
    #[default]
    Sinus,
    Ectopic,
    /// Sinus beat following an ectopic one, with a compensatory pause
    Compensatory,
}

/// Chaotic rhythm used instead of the oscillator during fibrillation
#[derive(Debug, Clone, Default)]
struct Fibrillation {
    frequency: [f32; k::VFIB_OSCILLATORS],
    amplitude: [f32; k::VFIB_OSCILLATORS],
    phase: [f32; k::VFIB_OSCILLATORS],
    until_update: f32,
}

impl Fibrillation {
    fn reset(&mut self, rng: &mut GaussianSource) {
        for i in 0..k::VFIB_OSCILLATORS {
            self.frequency[i] = rng.range(k::VFIB_MIN_HZ, k::VFIB_MAX_HZ);
            self.amplitude[i] = rng.range(0.05, 0.25);
            self.phase[i] = rng.range(0.0, TAU);
        }
        self.until_update = k::VFIB_UPDATE_INTERVAL_S;
    }

    fn step(&mut self, dt: f32, rng: &mut GaussianSource) -> f32 {
        self.until_update -= dt;
        if self.until_update <= 0.0 {
            self.until_update += k::VFIB_UPDATE_INTERVAL_S;
            for i in 0..k::VFIB_OSCILLATORS {
                self.frequency[i] = rng.gaussian(self.frequency[i], 0.3).clamp(k::VFIB_MIN_HZ, k::VFIB_MAX_HZ);
                self.amplitude[i] = rng.gaussian(self.amplitude[i], 0.03).clamp(0.03, 0.3);
            }
        }

        let mut value = 0.0;
        for i in 0..k::VFIB_OSCILLATORS {
            value += self.amplitude[i] * self.phase[i].sin();
            self.phase[i] = (self.phase[i] + TAU * self.frequency[i] * dt) % TAU;
        }
        value
    }
}

/// Live diagnostics of the cardiac model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EcgMetrics {
    pub beat_count: u64,
    pub heart_rate_bpm: f32,
    pub last_rr_s: f32,
    pub phase_rad: f32,
    pub beat_kind: BeatKind,
}

#[derive(Debug, Clone)]
pub struct EcgModel {
    params: EcgParameters,
    pending: Option<EcgParameters>,
    rng: GaussianSource,
    hrv: RrGenerator,

    x: f32,
    y: f32,
    z: f32,
    theta: f32,
    omega: f32,
    rr: f32,

    kernels: [Kernel; 5],
    beat_kind: BeatKind,
    beat_count: u64,
    beats_until_ectopic: u32,

    fibrillation: Fibrillation,
    f_wave_phase: f32,
}

impl EcgModel {
    pub fn new(seed: u64) -> Self {
        let params = EcgParameters::default();
        let mut model = Self {
            params,
            pending: None,
            rng: GaussianSource::new(seed),
            hrv: RrGenerator::new(rr_settings(&params)),
            x: -1.0,
            y: 0.0,
            z: 0.0,
            theta: PI,
            omega: TAU,
            rr: 1.0,
            kernels: [Kernel::default(); 5],
            beat_kind: BeatKind::Sinus,
            beat_count: 0,
            beats_until_ectopic: k::PVC_MAX_INTERVAL_BEATS,
            fibrillation: Fibrillation::default(),
            f_wave_phase: 0.0,
        };
        model.reset();
        model
    }

    /// Oscillator angle in `(-π, π]`
    pub fn phase(&self) -> f32 {
        self.theta
    }

    /// Interval of the beat in progress
    pub fn current_rr(&self) -> f32 {
        self.rr
    }

    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    /// Raw third state variable in mV, before lead gain and noise
    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn rr_bounds(&self) -> (f32, f32) {
        self.hrv.bounds()
    }

    fn is_fibrillating(&self) -> bool {
        self.params.condition == EcgCondition::VentricularFibrillation
    }

    /// Start the next beat: apply pending parameters, draw RR and morphology
    fn begin_beat(&mut self) {
        if let Some(next) = self.pending.take() {
            self.params = next;
            self.hrv.update(rr_settings(&next));
        }

        let mut rr = self.hrv.next_rr(&mut self.rng);
        self.beat_kind = match (self.params.condition, self.beat_kind) {
            (EcgCondition::PrematureVentricular, BeatKind::Ectopic) => BeatKind::Compensatory,
            (EcgCondition::PrematureVentricular, _) => {
                self.beats_until_ectopic = self.beats_until_ectopic.saturating_sub(1);
                if self.beats_until_ectopic == 0 {
                    self.beats_until_ectopic =
                        self.rng.range_inclusive(k::PVC_MIN_INTERVAL_BEATS, k::PVC_MAX_INTERVAL_BEATS);
                    BeatKind::Ectopic
                } else {
                    BeatKind::Sinus
                }
            }
            _ => BeatKind::Sinus,
        };

        match self.beat_kind {
            BeatKind::Ectopic => {
                let (low, high) = k::PVC_PREMATURE_FACTOR;
                rr = self.hrv.clip(rr * self.rng.range(low, high));
            }
            BeatKind::Compensatory => {
                let (low, high) = k::PVC_COMPENSATORY_FACTOR;
                rr = self.hrv.clip(rr * self.rng.range(low, high));
            }
            BeatKind::Sinus => {}
        }

        self.rr = rr;
        self.omega = TAU / rr;
        self.kernels = self.draw_kernels();
        self.beat_count += 1;
    }

    fn draw_kernels(&mut self) -> [Kernel; 5] {
        let hr = self.params.heart_rate_bpm.max(1.0);
        let hr_factor = (hr / 60.0).sqrt();
        let hr_factor2 = hr_factor.sqrt();
        let angle_scale = [hr_factor2, hr_factor, 1.0, hr_factor, hr_factor2];
        let p = &self.params;
        let factors = [p.p_amplitude, p.qrs_amplitude, p.qrs_amplitude, p.qrs_amplitude, p.t_amplitude];

        // widths grow with rate; the amplitude correction keeps each wave's
        // height (amplitude * width²) independent of rate
        let height_correction = 1.0 / (hr_factor * hr_factor);

        let mut kernels = [Kernel::default(); 5];
        for i in 0..5 {
            let amplitude_jitter = 1.0 + self.rng.gaussian(0.0, k::AMPLITUDE_JITTER);
            let width_jitter = 1.0 + self.rng.gaussian(0.0, k::WIDTH_JITTER);
            let angle_jitter = self.rng.gaussian(0.0, k::ANGLE_JITTER_RAD);

            kernels[i] = Kernel {
                angle: k::KERNEL_ANGLES_DEG[i].to_radians() * angle_scale[i] + angle_jitter,
                amplitude: k::KERNEL_AMPLITUDES[i]
                    * k::KERNEL_GAIN
                    * factors[i]
                    * amplitude_jitter
                    * height_correction,
                width: (k::KERNEL_WIDTHS[i] * hr_factor * width_jitter).max(0.01),
            };
        }

        if self.beat_kind == BeatKind::Ectopic {
            let widen = |kernel: &mut Kernel, height: f32| {
                let width = k::PVC_QRS_WIDTH * hr_factor;
                kernel.amplitude *= height * (kernel.width / width).powi(2);
                kernel.width = width;
            };
            kernels[P].amplitude = 0.0;
            kernels[Q].amplitude *= 0.3;
            widen(&mut kernels[R], 1.2);
            widen(&mut kernels[S], 1.3);
            kernels[S].angle += 0.1;
            kernels[T].amplitude = -1.5 * kernels[T].amplitude.abs();
            kernels[T].width *= 1.25;
        }

        kernels
    }

    #[inline]
    fn derivative(&self, x: f32, y: f32, z: f32) -> (f32, f32, f32) {
        let radius = (x * x + y * y).sqrt().max(k::RADIUS_EPSILON);
        let alpha = 1.0 - radius;
        let theta = y.atan2(x);
        let omega = self.omega;

        let dx = alpha * x - omega * y;
        let dy = alpha * y + omega * x;

        let mut dz = -z;
        for kernel in &self.kernels {
            let delta = wrap_angle(theta - kernel.angle);
            let two_b2 = 2.0 * kernel.width * kernel.width;
            dz -= omega * kernel.amplitude * delta * (-delta * delta / two_b2).exp();
        }
        dz += omega * st_slope(theta, self.params.st_shift_mv);

        (dx, dy, dz)
    }

    fn rk4_step(&mut self, h: f32) {
        let (x, y, z) = (self.x, self.y, self.z);
        let (k1x, k1y, k1z) = self.derivative(x, y, z);
        let (k2x, k2y, k2z) = self.derivative(x + 0.5 * h * k1x, y + 0.5 * h * k1y, z + 0.5 * h * k1z);
        let (k3x, k3y, k3z) = self.derivative(x + 0.5 * h * k2x, y + 0.5 * h * k2y, z + 0.5 * h * k2z);
        let (k4x, k4y, k4z) = self.derivative(x + h * k3x, y + h * k3y, z + h * k3z);

        self.x = x + h / 6.0 * (k1x + 2.0 * k2x + 2.0 * k3x + k4x);
        self.y = y + h / 6.0 * (k1y + 2.0 * k2y + 2.0 * k3y + k4y);
        self.z = z + h / 6.0 * (k1z + 2.0 * k2z + 2.0 * k3z + k4z);

        let radius = (self.x * self.x + self.y * self.y).sqrt();
        if !(self.x.is_finite() && self.y.is_finite() && radius > k::RADIUS_EPSILON && radius < 10.0) {
            // reseed on the limit cycle at the last good angle
            self.x = self.theta.cos();
            self.y = self.theta.sin();
        }
        if !self.z.is_finite() {
            self.z = 0.0;
        }
    }

    fn advance_oscillator(&mut self, dt: f32) {
        let steps = (dt / MAX_STEP_S).ceil().max(1.0) as usize;
        let h = dt / steps as f32;

        for _ in 0..steps {
            self.rk4_step(h);
            let theta = self.y.atan2(self.x);
            if self.theta > PI / 2.0 && theta < -PI / 2.0 {
                self.theta = theta;
                self.begin_beat();
            } else {
                self.theta = theta;
            }
        }
    }

    fn f_wave(&mut self, dt: f32) -> f32 {
        if self.params.condition != EcgCondition::AtrialFibrillation {
            return 0.0;
        }
        let frequency = 6.0 + self.rng.gaussian(0.0, 0.5);
        self.f_wave_phase = (self.f_wave_phase + TAU * frequency * dt) % TAU;
        0.04 * self.f_wave_phase.sin()
    }
}

impl WaveformModel for EcgModel {
    type Params = EcgParameters;
    type Metrics = EcgMetrics;

    fn reset(&mut self) {
        if let Some(next) = self.pending.take() {
            self.params = next;
        }
        self.hrv = RrGenerator::new(rr_settings(&self.params));
        self.hrv.reset(&mut self.rng);

        // start just past the TP boundary so the first beat is complete
        self.theta = -PI + 1.0e-3;
        self.x = self.theta.cos();
        self.y = self.theta.sin();
        self.z = 0.0;
        self.beat_count = 0;
        self.beat_kind = BeatKind::Sinus;
        self.beats_until_ectopic =
            self.rng.range_inclusive(k::PVC_MIN_INTERVAL_BEATS, k::PVC_MAX_INTERVAL_BEATS);
        self.f_wave_phase = self.rng.range(0.0, TAU);
        self.fibrillation.reset(&mut self.rng);
        self.begin_beat();
    }

    fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    fn set_parameters(&mut self, params: &EcgParameters) {
        let next = params.clamped();
        if next.condition != self.params.condition {
            self.params = next;
            self.reset();
        } else if self.is_fibrillating() {
            self.params = next;
        } else {
            self.pending = Some(next);
        }
    }

    fn parameters(&self) -> &EcgParameters {
        self.pending.as_ref().unwrap_or(&self.params)
    }

    fn next_value(&mut self, dt: f32) -> f32 {
        let signal = if self.is_fibrillating() {
            self.params.qrs_amplitude * self.fibrillation.step(dt, &mut self.rng)
        } else {
            self.advance_oscillator(dt);
            self.z + self.f_wave(dt)
        };

        let noise = self.rng.gaussian(0.0, self.params.noise_level * k::NOISE_SCALE_MV);
        let value = self.params.lead.gain() * signal + noise;
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    fn output_range(&self) -> OutputRange {
        OutputRange::new(k::OUTPUT_MIN_MV, k::OUTPUT_MAX_MV)
    }

    fn metrics(&self) -> EcgMetrics {
        EcgMetrics {
            beat_count: self.beat_count,
            heart_rate_bpm: 60.0 / self.rr.max(f32::EPSILON),
            last_rr_s: self.rr,
            phase_rad: self.theta,
            beat_kind: self.beat_kind,
        }
    }
}

fn rr_settings(params: &EcgParameters) -> RrSettings {
    let limits = limits::ecg(params.condition);
    RrSettings {
        mean_rr: 60.0 / params.heart_rate_bpm.max(1.0),
        std_fraction: limits.hrv_std.default,
        bound_fraction: limits.hrv_bound,
        absolute_min: k::ABSOLUTE_MIN_RR_S,
        absolute_max: k::ABSOLUTE_MAX_RR_S,
    }
}

/// Wrap into `[-π, π]`
#[inline]
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped.is_finite() {
        wrapped
    } else {
        0.0
    }
}

/// Angular derivative of the ST bump added to `z`.
///
/// Positive shifts use a symmetric `sin²` plateau, negative shifts a
/// down-sloping `sin² · (1 - u/2)` profile, with `u` the position inside the
/// ST window.
#[inline]
fn st_slope(theta: f32, shift_mv: f32) -> f32 {
    let (start, end) = k::ST_WINDOW_RAD;
    if shift_mv == 0.0 || theta <= start || theta >= end {
        return 0.0;
    }
    let span = end - start;
    let u = (theta - start) / span;
    let s = (PI * u).sin();
    let s2 = (2.0 * PI * u).sin();

    let d_bump_du = if shift_mv > 0.0 {
        PI * s2
    } else {
        PI * s2 * (1.0 - 0.5 * u) - 0.5 * s * s
    };
    shift_mv * d_bump_du / span
}
