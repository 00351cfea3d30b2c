// src/processing/filters/iir.rs
//! Biquad sections in transposed direct form II
//!
//! Coefficients are designed via the bilinear transform and stored
//! normalised (`a0 = 1`). Coefficients and state are `f64`: at a 0.05 Hz
//! corner and 1 kHz the pole pair sits within 1e-7 of the unit circle,
//! below `f32` resolution.

use super::{check_cutoff, BandType, FilterError};
use std::f64::consts::{PI, SQRT_2};

/// Normalised second-order section coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Pass-through section
    pub const IDENTITY: Self = Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 };

    /// Second-order Butterworth low- or high-pass, `K = tan(pi * fc / fs)`
    pub fn butterworth(cutoff: f32, sample_rate: f32, band_type: BandType) -> Result<Self, FilterError> {
        check_cutoff(cutoff, sample_rate)?;

        let k = (PI * cutoff as f64 / sample_rate as f64).tan();
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
        let a1 = 2.0 * (k2 - 1.0) * norm;
        let a2 = (1.0 - SQRT_2 * k + k2) * norm;

        let (b0, b1, b2) = match band_type {
            BandType::Lowpass => (k2 * norm, 2.0 * k2 * norm, k2 * norm),
            BandType::Highpass => (norm, -2.0 * norm, norm),
        };

        Self::from_f64(b0, b1, b2, a1, a2)
    }

    /// Narrow band-stop centred on `center` (RBJ cookbook notch)
    pub fn notch(center: f32, q: f32, sample_rate: f32) -> Result<Self, FilterError> {
        check_cutoff(center, sample_rate)?;
        if !q.is_finite() || q <= 0.0 {
            return Err(FilterError::InvalidParameters(format!("Notch Q {} must be positive", q)));
        }

        let w0 = 2.0 * PI * center as f64 / sample_rate as f64;
        let alpha = w0.sin() / (2.0 * q as f64);
        let cos_w0 = w0.cos();
        let a0 = 1.0 + alpha;

        Self::from_f64(
            1.0 / a0,
            -2.0 * cos_w0 / a0,
            1.0 / a0,
            -2.0 * cos_w0 / a0,
            (1.0 - alpha) / a0,
        )
    }

    fn from_f64(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Result<Self, FilterError> {
        let coefficients = Self { b0, b1, b2, a1, a2 };
        if !coefficients.is_stable() {
            return Err(FilterError::InvalidCoefficients(format!(
                "Unstable section a1={} a2={}",
                coefficients.a1, coefficients.a2
            )));
        }
        Ok(coefficients)
    }

    /// Stability triangle check on the denominator
    pub fn is_stable(&self) -> bool {
        let finite = [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite());
        finite && self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// |H(e^jw)| at `freq`
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * freq as f64 / sample_rate as f64;
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = self.b1 * s1 + self.b2 * s2;
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = self.a1 * s1 + self.a2 * s2;

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt() as f32
    }
}

/// One second-order section with its two state words
#[derive(Debug, Clone)]
pub struct Biquad {
    coefficients: BiquadCoefficients,
    w1: f64,
    w2: f64,
}

impl Biquad {
    pub fn new(coefficients: BiquadCoefficients) -> Self {
        Self { coefficients, w1: 0.0, w2: 0.0 }
    }

    pub fn butterworth(cutoff: f32, sample_rate: f32, band_type: BandType) -> Result<Self, FilterError> {
        Ok(Self::new(BiquadCoefficients::butterworth(cutoff, sample_rate, band_type)?))
    }

    pub fn notch(center: f32, q: f32, sample_rate: f32) -> Result<Self, FilterError> {
        Ok(Self::new(BiquadCoefficients::notch(center, q, sample_rate)?))
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let c = &self.coefficients;
        let x = input as f64;
        let output = c.b0 * x + self.w1;
        self.w1 = c.b1 * x - c.a1 * output + self.w2;
        self.w2 = c.b2 * x - c.a2 * output;

        // keep denormals out of the recursion
        if self.w1.abs() < 1.0e-200 {
            self.w1 = 0.0;
        }
        if self.w2.abs() < 1.0e-200 {
            self.w2 = 0.0;
        }

        output as f32
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.w1 = 0.0;
        self.w2 = 0.0;
    }

    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coefficients
    }
}

/// Fourth-order band-pass: Butterworth high-pass then low-pass
#[derive(Debug, Clone)]
pub struct BandPass {
    highpass: Biquad,
    lowpass: Biquad,
}

impl BandPass {
    pub fn new(low_cutoff: f32, high_cutoff: f32, sample_rate: f32) -> Result<Self, FilterError> {
        if low_cutoff >= high_cutoff {
            return Err(FilterError::InvalidParameters(format!(
                "Band edges {} Hz >= {} Hz",
                low_cutoff, high_cutoff
            )));
        }
        Ok(Self {
            highpass: Biquad::butterworth(low_cutoff, sample_rate, BandType::Highpass)?,
            lowpass: Biquad::butterworth(high_cutoff, sample_rate, BandType::Lowpass)?,
        })
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.lowpass.process_sample(self.highpass.process_sample(input))
    }

    pub fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
    }

    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        self.highpass.coefficients().magnitude_at(freq, sample_rate)
            * self.lowpass.coefficients().magnitude_at(freq, sample_rate)
    }
}
