// src/processing/filters/fir.rs
//! Linear-phase FIR low-pass for the output stage

use super::{check_cutoff, FilterError};

/// FIR filter over a circular delay line
#[derive(Debug, Clone)]
pub struct FirFilter {
    coefficients: Vec<f32>,
    delay_line: Vec<f32>,
    index: usize,
}

impl FirFilter {
    /// Create FIR filter from coefficients
    pub fn new(coefficients: Vec<f32>) -> Result<Self, FilterError> {
        if coefficients.is_empty() {
            return Err(FilterError::InvalidCoefficients("Empty coefficients".to_string()));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(FilterError::InvalidCoefficients("Non-finite coefficient".to_string()));
        }

        let length = coefficients.len();
        Ok(Self {
            coefficients,
            delay_line: vec![0.0; length],
            index: 0,
        })
    }

    /// Hamming-windowed sinc low-pass with unity DC gain.
    ///
    /// Any length is accepted; even lengths give a half-sample group delay.
    pub fn lowpass_windowed_sinc(cutoff: f32, sample_rate: f32, length: usize) -> Result<Self, FilterError> {
        if length == 0 {
            return Err(FilterError::InvalidParameters("Length must be non-zero".to_string()));
        }
        check_cutoff(cutoff, sample_rate)?;

        if length == 1 {
            return Self::new(vec![1.0]);
        }

        let fc = cutoff as f64 / sample_rate as f64;
        let center = (length - 1) as f64 / 2.0;
        let pi = std::f64::consts::PI;

        let mut taps: Vec<f64> = (0..length)
            .map(|i| {
                let n = i as f64 - center;
                let sinc = if n.abs() < 1e-9 {
                    2.0 * fc
                } else {
                    (2.0 * pi * fc * n).sin() / (pi * n)
                };
                let window = 0.54 - 0.46 * (2.0 * pi * i as f64 / (length - 1) as f64).cos();
                sinc * window
            })
            .collect();

        let dc_gain: f64 = taps.iter().sum();
        if dc_gain.abs() < 1e-12 {
            return Err(FilterError::InvalidCoefficients("Zero DC gain".to_string()));
        }
        taps.iter_mut().for_each(|t| *t /= dc_gain);

        Self::new(taps.into_iter().map(|t| t as f32).collect())
    }

    /// Process single sample
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let length = self.coefficients.len();
        self.delay_line[self.index] = input;

        let mut output = 0.0;
        let mut tap = self.index;
        for &coefficient in &self.coefficients {
            output += coefficient * self.delay_line[tap];
            tap = if tap == 0 { length - 1 } else { tap - 1 };
        }

        self.index = (self.index + 1) % length;
        output
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.delay_line.fill(0.0);
        self.index = 0;
    }

    pub fn length(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windowed_sinc_is_symmetric_with_unity_gain() {
        for length in [15usize, 16, 21] {
            let filter = FirFilter::lowpass_windowed_sinc(150.0, 1000.0, length).unwrap();
            let coeffs = filter.coefficients();

            assert_eq!(coeffs.len(), length);
            for i in 0..length / 2 {
                assert!((coeffs[i] - coeffs[length - 1 - i]).abs() < 1e-6);
            }
            let sum: f32 = coeffs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_step_settles_after_length_samples() {
        let mut filter = FirFilter::lowpass_windowed_sinc(50.0, 1000.0, 16).unwrap();
        let mut out = 0.0;
        for _ in 0..16 {
            out = filter.process_sample(2.0);
        }
        assert!((out - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_fir_processing() {
        let mut filter = FirFilter::new(vec![0.5, 0.5]).unwrap();

        assert_eq!(filter.process_sample(1.0), 0.5);
        assert_eq!(filter.process_sample(1.0), 1.0);

        filter.reset();
        assert_eq!(filter.process_sample(1.0), 0.5);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(FirFilter::new(vec![]).is_err());
        assert!(FirFilter::new(vec![f32::NAN]).is_err());
        assert!(FirFilter::lowpass_windowed_sinc(100.0, 1000.0, 0).is_err());
        assert!(FirFilter::lowpass_windowed_sinc(600.0, 1000.0, 21).is_err());
    }
}
