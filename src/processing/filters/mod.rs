// src/processing/filters/mod.rs
//! Digital filters conditioning model output before quantization

pub mod chain;
pub mod fir;
pub mod iir;

pub use chain::{FilterChain, FilterPreset};
pub use fir::FirFilter;
pub use iir::{BandPass, Biquad, BiquadCoefficients};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandType {
    Lowpass,
    Highpass,
}

/// Common filter error types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    InvalidParameters(String),
    InvalidCoefficients(String),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            FilterError::InvalidCoefficients(msg) => write!(f, "Invalid coefficients: {}", msg),
        }
    }
}

impl std::error::Error for FilterError {}

/// Reject cutoffs outside `(0, fs/2)`
pub(crate) fn check_cutoff(cutoff: f32, sample_rate: f32) -> Result<(), FilterError> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(FilterError::InvalidParameters(format!(
            "Invalid sample rate {}",
            sample_rate
        )));
    }
    if !cutoff.is_finite() || cutoff <= 0.0 || cutoff >= sample_rate / 2.0 {
        return Err(FilterError::InvalidParameters(format!(
            "Cutoff {} Hz outside (0, {}) Hz",
            cutoff,
            sample_rate / 2.0
        )));
    }
    Ok(())
}
