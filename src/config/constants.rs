// src/config/constants.rs
//! System-wide configuration constants

/// Output sampling and DAC constants
pub mod signal {
    /// Unified output rate shared by every signal kind
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 1000;
    pub const MIN_SAMPLE_RATE_HZ: u32 = 100;
    pub const MAX_SAMPLE_RATE_HZ: u32 = 10_000;

    pub const DAC_MAX_CODE: u8 = u8::MAX;
    pub const DAC_MID_SCALE: u8 = 128;
}

/// Sample ring and producer scheduling
pub mod buffer {
    /// About four seconds of output at the default rate
    pub const DEFAULT_CAPACITY_SAMPLES: usize = 4096;
    pub const MIN_CAPACITY_SAMPLES: usize = 64;
    pub const MAX_CAPACITY_SAMPLES: usize = 1 << 20;

    pub const DEFAULT_BLOCK_SIZE_SAMPLES: usize = 128;
    pub const MIN_BLOCK_SIZE_SAMPLES: usize = 1;

    /// Fraction of the ring filled before the output timer is enabled
    pub const DEFAULT_PREFILL_FRACTION: f32 = 0.5;
}

/// Timing of the background tasks and control lock
pub mod performance {
    pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 50;
    pub const DEFAULT_PRODUCER_YIELD_MICROS: u64 = 1000;
    pub const DEFAULT_PRODUCER_IDLE_MS: u64 = 20;
    pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 5000;

    /// Ticks a threaded timer may replay after falling behind
    pub const TIMER_MAX_CATCH_UP_TICKS: u32 = 16;

    pub const NANOSECONDS_PER_SECOND: u64 = 1_000_000_000;
    pub const MICROSECONDS_PER_SECOND: u64 = 1_000_000;
}

/// Filter stage constants
pub mod filters {
    pub const MAINS_FREQUENCY_50HZ: f32 = 50.0;
    pub const MAINS_FREQUENCY_60HZ: f32 = 60.0;
    pub const DEFAULT_NOTCH_Q: f32 = 30.0;

    /// Output-stage FIR order; taps = order + 1
    pub const FIR_ORDER: usize = 15;
    pub const FIR_TAPS: usize = FIR_ORDER + 1;

    /// Cutoffs above this fraction of the sample rate are pulled down
    pub const MAX_CUTOFF_FRACTION: f32 = 0.45;

    pub const ECG_HIGHPASS_HZ: f32 = 0.05;
    pub const ECG_LOWPASS_HZ: f32 = 150.0;
    pub const ECG_FIR_CUTOFF_HZ: f32 = 150.0;

    pub const EMG_HIGHPASS_HZ: f32 = 20.0;
    pub const EMG_LOWPASS_HZ: f32 = 450.0;
    pub const EMG_FIR_CUTOFF_HZ: f32 = 450.0;

    pub const PPG_LOWPASS_HZ: f32 = 10.0;
    pub const PPG_FIR_CUTOFF_HZ: f32 = 50.0;
}

/// Cardiac oscillator constants
pub mod ecg {
    /// Angular position of the P, Q, R, S, T kernels in degrees
    pub const KERNEL_ANGLES_DEG: [f32; 5] = [-70.0, -15.0, 0.0, 15.0, 100.0];
    pub const KERNEL_AMPLITUDES: [f32; 5] = [1.2, -5.0, 30.0, -7.5, 0.75];
    pub const KERNEL_WIDTHS: [f32; 5] = [0.25, 0.1, 0.1, 0.1, 0.4];

    /// Scales the z-forcing so the R peak lands near 1.2 mV
    pub const KERNEL_GAIN: f32 = 4.0;

    pub const AMPLITUDE_JITTER: f32 = 0.05;
    pub const WIDTH_JITTER: f32 = 0.02;
    pub const ANGLE_JITTER_RAD: f32 = 0.01;

    /// Lower bound on the limit-cycle radius before the state is reseeded
    pub const RADIUS_EPSILON: f32 = 1.0e-6;

    pub const OUTPUT_MIN_MV: f32 = -0.5;
    pub const OUTPUT_MAX_MV: f32 = 1.5;
    pub const NOISE_SCALE_MV: f32 = 0.05;

    pub const LF_CENTER_HZ: f32 = 0.1;
    pub const HF_CENTER_HZ: f32 = 0.25;
    pub const HRV_CENTER_SPREAD_HZ: f32 = 0.01;
    pub const LF_HF_RATIO: f32 = 0.5;

    pub const VFIB_OSCILLATORS: usize = 5;
    pub const VFIB_MIN_HZ: f32 = 4.0;
    pub const VFIB_MAX_HZ: f32 = 10.0;
    pub const VFIB_UPDATE_INTERVAL_S: f32 = 0.05;

    pub const PVC_MIN_INTERVAL_BEATS: u32 = 4;
    pub const PVC_MAX_INTERVAL_BEATS: u32 = 8;
    pub const PVC_PREMATURE_FACTOR: (f32, f32) = (0.65, 0.80);
    pub const PVC_COMPENSATORY_FACTOR: (f32, f32) = (1.20, 1.40);
    pub const PVC_QRS_WIDTH: f32 = 0.18;

    pub const ST_WINDOW_RAD: (f32, f32) = (0.25, 1.3);

    pub const ABSOLUTE_MIN_RR_S: f32 = 0.12;
    pub const ABSOLUTE_MAX_RR_S: f32 = 2.5;
}

/// Motor-unit pool constants
pub mod emg {
    pub const MOTOR_UNIT_COUNT: usize = 100;
    /// Excitation (fraction of MVC) at which the last unit is recruited
    pub const RECRUITMENT_RANGE: f32 = 0.6;
    pub const THRESHOLD_SPREAD: f32 = 60.0;

    pub const MIN_UNIT_AMPLITUDE_MV: f32 = 0.05;
    pub const MAX_UNIT_AMPLITUDE_MV: f32 = 1.5;

    pub const MIN_FIRING_RATE_HZ: f32 = 6.0;
    pub const MAX_FIRING_RATE_HZ: f32 = 50.0;
    /// Rate gain in Hz per unit of excitation above threshold
    pub const FIRING_RATE_GAIN: f32 = 40.0;
    pub const ISI_JITTER: f32 = 0.2;
    pub const MIN_ISI_S: f32 = 0.015;
    pub const MAX_ISI_S: f32 = 0.2;

    pub const MUAP_SIGMA_S: f32 = 0.002;
    pub const MUAP_DURATION_S: f32 = 0.012;
    /// Cosine taper at each end of the support window
    pub const MUAP_TAPER_S: f32 = 0.002;
    pub const MUAP_SCALE: f32 = 0.5;

    pub const RECRUITMENT_UPDATE_INTERVAL_S: f32 = 0.005;

    pub const FORCE_VARIATION_HZ: f32 = 2.0;
    pub const FORCE_VARIATION_DEPTH: f32 = 0.04;
    pub const FORCE_NOISE_STD: f32 = 0.02;

    pub const TREMOR_MIN_HZ: f32 = 4.0;
    pub const TREMOR_MAX_HZ: f32 = 6.0;
    pub const MYOPATHY_AMPLITUDE: f32 = 0.4;
    pub const NEUROPATHY_SURVIVAL: f32 = 0.3;
    pub const NEUROPATHY_AMPLITUDE: f32 = 2.5;
    pub const FASCICULATION_RATE_HZ: f32 = 3.0;
    pub const FATIGUE_RATE_PER_S: f32 = 0.01;
    pub const FATIGUE_MAX: f32 = 0.8;
    pub const FATIGUE_RATE_DROP: f32 = 0.3;
    pub const FATIGUE_AMPLITUDE_GAIN: f32 = 0.5;

    pub const NOISE_SCALE_MV: f32 = 0.1;
    pub const RMS_WINDOW_SAMPLES: usize = 100;
    pub const OUTPUT_RANGE_MV: f32 = 5.0;
}

/// Photoplethysmograph constants
pub mod ppg {
    pub const SYSTOLIC_POSITION: f32 = 0.15;
    pub const SYSTOLIC_WIDTH: f32 = 0.055;
    pub const DIASTOLIC_POSITION: f32 = 0.40;
    pub const DIASTOLIC_WIDTH: f32 = 0.10;
    pub const DIASTOLIC_RATIO: f32 = 0.4;
    pub const NOTCH_POSITION: f32 = 0.30;
    pub const NOTCH_WIDTH: f32 = 0.02;
    pub const SHAPE_NORMALIZATION: f32 = 1.4;

    /// Pulse amplitude in mV per percent of perfusion index
    pub const AC_SCALE_MV_PER_PI: f32 = 15.0;
    pub const SPO2_DC_SLOPE_MV: f32 = 1.5;
    pub const SPO2_REFERENCE: f32 = 97.0;

    pub const RESPIRATION_MIN_HZ: f32 = 0.2;
    pub const RESPIRATION_MAX_HZ: f32 = 0.33;
    pub const RESPIRATION_MIN_DEPTH: f32 = 0.05;
    pub const RESPIRATION_MAX_DEPTH: f32 = 0.15;
    pub const BASELINE_WANDER: f32 = 0.05;

    pub const ARRHYTHMIA_PREMATURE_PROBABILITY: f32 = 0.15;
    pub const ARRHYTHMIA_PREMATURE_FACTOR: f32 = 0.7;

    pub const MIN_RR_S: f32 = 0.3;
    pub const MAX_RR_S: f32 = 2.0;

    pub const NOISE_SCALE_MV: f32 = 4.0;
    pub const OUTPUT_MIN_MV: f32 = -60.0;
    pub const OUTPUT_MAX_MV: f32 = 240.0;
}

/// Default config file locations
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/biosim/config.toml";
    pub const LOCAL_CONFIG_FILE: &str = "biosim.toml";
    pub const ENV_PREFIX: &str = "BIOSIM_";
    /// Separates section from field in environment overrides
    pub const ENV_SEPARATOR: &str = "__";
}
