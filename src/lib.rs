//! biosim-core: real-time physiological waveform synthesis
//!
//! Generates ECG, EMG and PPG signals sample by sample and streams them to an
//! 8-bit analog output on a fixed timer:
//!
//! - Waveform models with heart-rate variability and named pathologies
//! - Biquad and FIR filter chains per signal kind
//! - Lock-free single-producer/single-consumer sample ring
//! - Block producer task and a non-blocking, allocation-free output tick
//! - Layered TOML/environment configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use biosim_core::{SignalEngine, SignalKind, SystemConfig};
//! use biosim_core::hal::{SimulatedDac, ThreadTimer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dac = Arc::new(SimulatedDac::new());
//!     let engine = SignalEngine::new(SystemConfig::default(), Box::new(ThreadTimer::new()), dac.clone())?;
//!
//!     engine.start(SignalKind::Ecg)?;
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     println!("{:?}", engine.performance_stats());
//!     engine.stop()?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod hal;
pub mod models;
pub mod processing;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, SystemConfig};
pub use engine::{PerformanceStats, ProducerStep, SignalEngine, SignalSnapshot, SignalState};
pub use error::{ErrorCategory, SimError, SimResult};
pub use hal::{AnalogOutput, DacSample, HalError, PeriodicTimer, DAC_MID_SCALE};
pub use models::{ModelMetrics, ParameterSet, SignalKind, WaveformModel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Real-time physiological waveform synthesis".to_string(),
        signals: SignalKind::ACTIVE.to_vec(),
    }
}

/// Library version information
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Signal kinds that can be started
    pub signals: Vec<SignalKind>,
}
