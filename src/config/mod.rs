// src/config/mod.rs
//! Engine configuration
//!
//! Every field carries a serde default backed by [`constants`], so a partial
//! TOML file (or none at all) yields a complete [`SystemConfig`].

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete engine configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SystemConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub producer: ProducerSettings,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

/// Output cadence, ring sizing and control-lock behaviour
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineSettings {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Ring capacity in samples, power of two
    #[serde(default = "defaults::buffer_capacity")]
    pub buffer_capacity: usize,

    #[serde(default = "defaults::block_size")]
    pub block_size: usize,

    #[serde(default = "defaults::prefill_fraction")]
    pub prefill_fraction: f32,

    #[serde(default = "defaults::lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Fixed model seed; a fresh seed is drawn on every start when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Producer task scheduling
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProducerSettings {
    /// Spawn the background producer thread. Disabled in tests that step
    /// the producer by hand.
    #[serde(default = "defaults::background")]
    pub background: bool,

    #[serde(default = "defaults::yield_micros")]
    pub yield_micros: u64,

    #[serde(default = "defaults::idle_ms")]
    pub idle_ms: u64,
}

/// Filter stage configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterSettings {
    #[serde(default = "defaults::filters_enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::notch_enabled")]
    pub notch_enabled: bool,

    #[serde(default = "defaults::mains_frequency_hz")]
    pub mains_frequency_hz: f32,

    #[serde(default = "defaults::notch_q")]
    pub notch_q: f32,

    #[serde(default = "defaults::fir_enabled")]
    pub fir_enabled: bool,

    #[serde(default = "defaults::fir_taps")]
    pub fir_taps: usize,
}

/// Background statistics reporting
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonitorSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::report_interval_ms")]
    pub report_interval_ms: u64,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn sample_rate_hz() -> u32 { signal::DEFAULT_SAMPLE_RATE_HZ }
    pub fn buffer_capacity() -> usize { buffer::DEFAULT_CAPACITY_SAMPLES }
    pub fn block_size() -> usize { buffer::DEFAULT_BLOCK_SIZE_SAMPLES }
    pub fn prefill_fraction() -> f32 { buffer::DEFAULT_PREFILL_FRACTION }
    pub fn lock_timeout_ms() -> u64 { performance::DEFAULT_LOCK_TIMEOUT_MS }

    pub fn background() -> bool { true }
    pub fn yield_micros() -> u64 { performance::DEFAULT_PRODUCER_YIELD_MICROS }
    pub fn idle_ms() -> u64 { performance::DEFAULT_PRODUCER_IDLE_MS }

    pub fn filters_enabled() -> bool { true }
    pub fn notch_enabled() -> bool { true }
    pub fn mains_frequency_hz() -> f32 { filters::MAINS_FREQUENCY_50HZ }
    pub fn notch_q() -> f32 { filters::DEFAULT_NOTCH_Q }
    pub fn fir_enabled() -> bool { true }
    pub fn fir_taps() -> usize { filters::FIR_TAPS }

    pub fn report_interval_ms() -> u64 { performance::DEFAULT_MONITOR_INTERVAL_MS }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            buffer_capacity: defaults::buffer_capacity(),
            block_size: defaults::block_size(),
            prefill_fraction: defaults::prefill_fraction(),
            lock_timeout_ms: defaults::lock_timeout_ms(),
            seed: None,
        }
    }
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            background: defaults::background(),
            yield_micros: defaults::yield_micros(),
            idle_ms: defaults::idle_ms(),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: defaults::filters_enabled(),
            notch_enabled: defaults::notch_enabled(),
            mains_frequency_hz: defaults::mains_frequency_hz(),
            notch_q: defaults::notch_q(),
            fir_enabled: defaults::fir_enabled(),
            fir_taps: defaults::fir_taps(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            report_interval_ms: defaults::report_interval_ms(),
        }
    }
}

impl EngineSettings {
    /// Time between two output ticks
    pub fn sample_period(&self) -> Duration {
        Duration::from_nanos(performance::NANOSECONDS_PER_SECOND / self.sample_rate_hz.max(1) as u64)
    }

    pub fn sample_period_micros(&self) -> u32 {
        (performance::MICROSECONDS_PER_SECOND / self.sample_rate_hz.max(1) as u64) as u32
    }

    /// Model step in seconds
    pub fn dt(&self) -> f32 {
        1.0 / self.sample_rate_hz.max(1) as f32
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Samples generated before the output timer starts on a fresh run
    pub fn prefill_samples(&self) -> usize {
        let target = (self.buffer_capacity as f32 * self.prefill_fraction.clamp(0.0, 1.0)) as usize;
        target.min(self.buffer_capacity.saturating_sub(1))
    }
}

impl SystemConfig {
    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let engine = &self.engine;

        if engine.sample_rate_hz < signal::MIN_SAMPLE_RATE_HZ
            || engine.sample_rate_hz > signal::MAX_SAMPLE_RATE_HZ
        {
            errors.push(format!(
                "Sample rate {} Hz outside {}..={} Hz",
                engine.sample_rate_hz,
                signal::MIN_SAMPLE_RATE_HZ,
                signal::MAX_SAMPLE_RATE_HZ
            ));
        }

        if !engine.buffer_capacity.is_power_of_two()
            || engine.buffer_capacity < buffer::MIN_CAPACITY_SAMPLES
            || engine.buffer_capacity > buffer::MAX_CAPACITY_SAMPLES
        {
            errors.push(format!(
                "Buffer capacity {} must be a power of two in {}..={}",
                engine.buffer_capacity,
                buffer::MIN_CAPACITY_SAMPLES,
                buffer::MAX_CAPACITY_SAMPLES
            ));
        }

        if engine.block_size < buffer::MIN_BLOCK_SIZE_SAMPLES
            || engine.block_size > engine.buffer_capacity / 2
        {
            errors.push(format!(
                "Block size {} must be between {} and half the buffer capacity ({})",
                engine.block_size,
                buffer::MIN_BLOCK_SIZE_SAMPLES,
                engine.buffer_capacity / 2
            ));
        }

        if !engine.prefill_fraction.is_finite() || !(0.0..=1.0).contains(&engine.prefill_fraction) {
            errors.push(format!("Prefill fraction {} must be within 0..=1", engine.prefill_fraction));
        }

        if engine.lock_timeout_ms == 0 {
            errors.push("Lock timeout must be non-zero".to_string());
        }

        let mains = self.filters.mains_frequency_hz;
        if mains != filters::MAINS_FREQUENCY_50HZ && mains != filters::MAINS_FREQUENCY_60HZ {
            errors.push(format!("Mains frequency {} Hz must be 50 or 60", mains));
        }

        if !self.filters.notch_q.is_finite() || self.filters.notch_q <= 0.0 {
            errors.push(format!("Notch Q {} must be positive", self.filters.notch_q));
        }

        if self.filters.fir_taps == 0 || self.filters.fir_taps > 255 {
            errors.push(format!("FIR taps {} must be within 1..=255", self.filters.fir_taps));
        }

        if self.monitor.report_interval_ms == 0 {
            errors.push("Monitor report interval must be non-zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SystemConfig::default();
        assert_eq!(config.engine.sample_rate_hz, signal::DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(config.engine.buffer_capacity, buffer::DEFAULT_CAPACITY_SAMPLES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = SystemConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SystemConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SystemConfig = toml::from_str("[engine]\nblock_size = 256\n").unwrap();

        assert_eq!(config.engine.block_size, 256);
        assert_eq!(config.engine.sample_rate_hz, signal::DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(config.filters.notch_q, filters::DEFAULT_NOTCH_Q);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = SystemConfig::default();
        config.engine.buffer_capacity = 1000;
        config.filters.mains_frequency_hz = 55.0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_block_must_fit_twice() {
        let mut config = SystemConfig::default();
        config.engine.block_size = config.engine.buffer_capacity;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timing_helpers() {
        let engine = EngineSettings::default();
        assert_eq!(engine.sample_period_micros(), 1000);
        assert_eq!(engine.sample_period(), Duration::from_millis(1));
        assert!((engine.dt() - 0.001).abs() < 1e-9);
        assert_eq!(engine.prefill_samples(), 2048);
    }
}
