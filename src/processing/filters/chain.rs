// src/processing/filters/chain.rs
//! Per-signal filter chains: band-pass or single IIR sections, optional mains
//! notch, FIR output stage

use super::{BandPass, BandType, Biquad, FilterError, FirFilter};
use crate::config::{constants::filters, FilterSettings};
use crate::models::SignalKind;

/// Corner frequencies of one signal kind's chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPreset {
    pub highpass_hz: Option<f32>,
    pub lowpass_hz: Option<f32>,
    pub notch: bool,
    pub fir_cutoff_hz: f32,
}

impl FilterPreset {
    pub const ECG: Self = Self {
        highpass_hz: Some(filters::ECG_HIGHPASS_HZ),
        lowpass_hz: Some(filters::ECG_LOWPASS_HZ),
        notch: true,
        fir_cutoff_hz: filters::ECG_FIR_CUTOFF_HZ,
    };

    pub const EMG: Self = Self {
        highpass_hz: Some(filters::EMG_HIGHPASS_HZ),
        lowpass_hz: Some(filters::EMG_LOWPASS_HZ),
        notch: true,
        fir_cutoff_hz: filters::EMG_FIR_CUTOFF_HZ,
    };

    /// Low-pass only, the DC level carries the saturation offset
    pub const PPG: Self = Self {
        highpass_hz: None,
        lowpass_hz: Some(filters::PPG_LOWPASS_HZ),
        notch: false,
        fir_cutoff_hz: filters::PPG_FIR_CUTOFF_HZ,
    };

    pub fn for_kind(kind: SignalKind) -> Option<Self> {
        match kind {
            SignalKind::Ecg => Some(Self::ECG),
            SignalKind::Emg => Some(Self::EMG),
            SignalKind::Ppg => Some(Self::PPG),
            SignalKind::None => None,
        }
    }
}

/// Filter chain applied to one model's output, sample by sample.
///
/// All sections are built up front; processing never allocates.
#[derive(Debug, Clone)]
pub struct FilterChain {
    /// Fourth-order band when the preset has both corners
    band: Option<BandPass>,
    sections: Vec<Biquad>,
    fir: Option<FirFilter>,
    enabled: bool,
}

impl FilterChain {
    pub fn new(preset: FilterPreset, settings: &FilterSettings, sample_rate: f32) -> Result<Self, FilterError> {
        let ceiling = sample_rate * filters::MAX_CUTOFF_FRACTION;
        let mut sections = Vec::with_capacity(2);

        let band = match (preset.highpass_hz, preset.lowpass_hz) {
            (Some(low), Some(high)) => {
                Some(BandPass::new(low.min(ceiling), high.min(ceiling), sample_rate)?)
            }
            (low, high) => {
                if let Some(hz) = low {
                    sections.push(Biquad::butterworth(hz.min(ceiling), sample_rate, BandType::Highpass)?);
                }
                if let Some(hz) = high {
                    sections.push(Biquad::butterworth(hz.min(ceiling), sample_rate, BandType::Lowpass)?);
                }
                None
            }
        };
        if preset.notch && settings.notch_enabled && settings.mains_frequency_hz < ceiling {
            sections.push(Biquad::notch(settings.mains_frequency_hz, settings.notch_q, sample_rate)?);
        }

        let fir = if settings.fir_enabled {
            Some(FirFilter::lowpass_windowed_sinc(
                preset.fir_cutoff_hz.min(ceiling),
                sample_rate,
                settings.fir_taps,
            )?)
        } else {
            None
        };

        Ok(Self {
            band,
            sections,
            fir,
            enabled: settings.enabled,
        })
    }

    /// Chain for `kind`, or a pass-through chain for `SignalKind::None`
    pub fn for_kind(kind: SignalKind, settings: &FilterSettings, sample_rate: f32) -> Result<Self, FilterError> {
        match FilterPreset::for_kind(kind) {
            Some(preset) => Self::new(preset, settings, sample_rate),
            None => Ok(Self::passthrough()),
        }
    }

    pub fn passthrough() -> Self {
        Self {
            band: None,
            sections: Vec::new(),
            fir: None,
            enabled: false,
        }
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        if !self.enabled {
            return input;
        }
        let mut value = match self.band.as_mut() {
            Some(band) => band.process_sample(input),
            None => input,
        };
        for section in &mut self.sections {
            value = section.process_sample(value);
        }
        match self.fir.as_mut() {
            Some(fir) => fir.process_sample(value),
            None => value,
        }
    }

    /// Clear every delay line, independent of the model
    pub fn reset(&mut self) {
        if let Some(band) = self.band.as_mut() {
            band.reset();
        }
        self.sections.iter_mut().for_each(Biquad::reset);
        if let Some(fir) = self.fir.as_mut() {
            fir.reset();
        }
    }

    /// Number of second-order sections, band-pass included
    pub fn section_count(&self) -> usize {
        let band = if self.band.is_some() { 2 } else { 0 };
        band + self.sections.len()
    }

    pub fn band(&self) -> Option<&BandPass> {
        self.band.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f32 = 1000.0;

    #[test]
    fn test_presets_build_for_each_kind() {
        let settings = FilterSettings::default();
        assert_eq!(FilterChain::for_kind(SignalKind::Ecg, &settings, FS).unwrap().section_count(), 3);
        assert_eq!(FilterChain::for_kind(SignalKind::Emg, &settings, FS).unwrap().section_count(), 3);
        assert_eq!(FilterChain::for_kind(SignalKind::Ppg, &settings, FS).unwrap().section_count(), 1);
        assert!(!FilterChain::for_kind(SignalKind::None, &settings, FS).unwrap().is_enabled());
    }

    #[test]
    fn test_ppg_chain_keeps_dc() {
        let mut chain = FilterChain::for_kind(SignalKind::Ppg, &FilterSettings::default(), FS).unwrap();
        let mut out = 0.0;
        for _ in 0..5000 {
            out = chain.process_sample(3.0);
        }
        assert!((out - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_emg_chain_removes_mains() {
        let mut chain = FilterChain::for_kind(SignalKind::Emg, &FilterSettings::default(), FS).unwrap();
        let mut peak: f32 = 0.0;
        for n in 0..4000 {
            let t = n as f32 / FS;
            let out = chain.process_sample((2.0 * std::f32::consts::PI * 50.0 * t).sin());
            if n > 3000 {
                peak = peak.max(out.abs());
            }
        }
        assert!(peak < 0.05, "residual mains {}", peak);
    }

    #[test]
    fn test_band_kinds_use_fourth_order_band() {
        let settings = FilterSettings::default();
        let emg = FilterChain::for_kind(SignalKind::Emg, &settings, FS).unwrap();
        let band = emg.band().expect("emg band");
        assert!(band.magnitude_at(2.0, FS) < 0.02);
        assert!((band.magnitude_at(120.0, FS) - 1.0).abs() < 0.05);

        assert!(FilterChain::for_kind(SignalKind::Ecg, &settings, FS).unwrap().band().is_some());
        assert!(FilterChain::for_kind(SignalKind::Ppg, &settings, FS).unwrap().band().is_none());
    }

    #[test]
    fn test_disabled_chain_is_identity() {
        let settings = FilterSettings { enabled: false, ..FilterSettings::default() };
        let mut chain = FilterChain::for_kind(SignalKind::Ecg, &settings, FS).unwrap();
        assert_eq!(chain.process_sample(0.75), 0.75);
    }

    #[test]
    fn test_cutoffs_follow_low_sample_rates() {
        let chain = FilterChain::for_kind(SignalKind::Emg, &FilterSettings::default(), 250.0);
        assert!(chain.is_ok());
    }
}
