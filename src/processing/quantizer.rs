// src/processing/quantizer.rs
//! Mapping from physical units to DAC codes

use crate::config::constants::signal::DAC_MAX_CODE;
use crate::hal::types::{DacSample, DAC_MID_SCALE};
use serde::{Deserialize, Serialize};

/// Physical range spanned by the DAC, lowest code to highest code
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRange {
    pub min: f32,
    pub max: f32,
}

impl OutputRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Range centred on zero, so 0 maps to mid-scale
    pub const fn symmetric(half_span: f32) -> Self {
        Self { min: -half_span, max: half_span }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Quantize with saturation. Non-finite input yields mid-scale.
    #[inline]
    pub fn quantize(&self, value: f32) -> DacSample {
        let span = self.span();
        if !value.is_finite() || !(span > 0.0) {
            return DAC_MID_SCALE;
        }
        let normalized = ((value - self.min) / span).clamp(0.0, 1.0);
        (normalized * DAC_MAX_CODE as f32).round() as DacSample
    }

    /// Centre value of the code bin
    pub fn dequantize(&self, code: DacSample) -> f32 {
        self.min + self.span() * code as f32 / DAC_MAX_CODE as f32
    }
}
