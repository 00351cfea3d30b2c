// src/models/limits.rs
//! Per-condition parameter ranges used for validation-by-clamping

use crate::models::params::{EcgCondition, EmgCondition, PpgCondition};

/// Closed range with a default value inside it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

pub const NOISE: ParamRange = ParamRange::new(0.0, 1.0, 0.05);
pub const QRS_AMPLITUDE: ParamRange = ParamRange::new(0.5, 2.0, 1.0);
pub const EMG_AMPLITUDE: ParamRange = ParamRange::new(0.1, 3.0, 1.0);

#[derive(Debug, Clone, Copy)]
pub struct EcgLimits {
    pub heart_rate: ParamRange,
    pub p_amplitude: ParamRange,
    pub t_amplitude: ParamRange,
    pub st_shift: ParamRange,
    /// Beat-to-beat RR standard deviation as a fraction of the mean RR
    pub hrv_std: ParamRange,
    /// RR never leaves `mean * (1 ± hrv_bound)`
    pub hrv_bound: f32,
}

pub fn ecg(condition: EcgCondition) -> EcgLimits {
    use EcgCondition::*;

    let normal_p = ParamRange::new(0.0, 2.0, 1.0);
    let normal_t = ParamRange::new(0.3, 2.0, 1.0);
    let flat_st = ParamRange::new(-0.1, 0.1, 0.0);

    match condition {
        Normal => EcgLimits {
            heart_rate: ParamRange::new(60.0, 100.0, 75.0),
            p_amplitude: normal_p,
            t_amplitude: normal_t,
            st_shift: flat_st,
            hrv_std: ParamRange::new(0.03, 0.08, 0.05),
            hrv_bound: 0.25,
        },
        Tachycardia => EcgLimits {
            heart_rate: ParamRange::new(100.0, 180.0, 130.0),
            p_amplitude: normal_p,
            t_amplitude: normal_t,
            st_shift: flat_st,
            hrv_std: ParamRange::new(0.03, 0.06, 0.04),
            hrv_bound: 0.2,
        },
        Bradycardia => EcgLimits {
            heart_rate: ParamRange::new(30.0, 59.0, 45.0),
            p_amplitude: normal_p,
            t_amplitude: normal_t,
            st_shift: flat_st,
            hrv_std: ParamRange::new(0.02, 0.05, 0.035),
            hrv_bound: 0.2,
        },
        AtrialFibrillation => EcgLimits {
            heart_rate: ParamRange::new(60.0, 180.0, 110.0),
            p_amplitude: ParamRange::new(0.0, 0.0, 0.0),
            t_amplitude: normal_t,
            st_shift: flat_st,
            hrv_std: ParamRange::new(0.15, 0.25, 0.2),
            hrv_bound: 0.5,
        },
        VentricularFibrillation => EcgLimits {
            heart_rate: ParamRange::new(150.0, 500.0, 300.0),
            p_amplitude: ParamRange::new(0.0, 0.0, 0.0),
            t_amplitude: normal_t,
            st_shift: flat_st,
            hrv_std: ParamRange::new(0.0, 0.0, 0.0),
            hrv_bound: 0.0,
        },
        PrematureVentricular => EcgLimits {
            heart_rate: ParamRange::new(50.0, 120.0, 75.0),
            p_amplitude: normal_p,
            t_amplitude: normal_t,
            st_shift: flat_st,
            hrv_std: ParamRange::new(0.04, 0.10, 0.06),
            hrv_bound: 0.5,
        },
        StElevation => EcgLimits {
            heart_rate: ParamRange::new(50.0, 110.0, 80.0),
            p_amplitude: normal_p,
            t_amplitude: normal_t,
            st_shift: ParamRange::new(0.1, 0.55, 0.3),
            hrv_std: ParamRange::new(0.03, 0.06, 0.045),
            hrv_bound: 0.25,
        },
        StDepression => EcgLimits {
            heart_rate: ParamRange::new(50.0, 150.0, 90.0),
            p_amplitude: normal_p,
            t_amplitude: normal_t,
            st_shift: ParamRange::new(-0.5, -0.05, -0.2),
            hrv_std: ParamRange::new(0.03, 0.06, 0.045),
            hrv_bound: 0.25,
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EmgLimits {
    /// Percent of MVC
    pub excitation: ParamRange,
}

pub fn emg(condition: EmgCondition) -> EmgLimits {
    use EmgCondition::*;

    let excitation = match condition {
        Rest => ParamRange::new(0.0, 10.0, 0.0),
        LowContraction => ParamRange::new(5.0, 30.0, 20.0),
        ModerateContraction => ParamRange::new(30.0, 60.0, 45.0),
        HighContraction => ParamRange::new(60.0, 100.0, 80.0),
        Tremor => ParamRange::new(0.0, 100.0, 30.0),
        Myopathy => ParamRange::new(0.0, 100.0, 40.0),
        Neuropathy => ParamRange::new(0.0, 100.0, 50.0),
        Fasciculation => ParamRange::new(0.0, 10.0, 0.0),
        Fatigue => ParamRange::new(20.0, 90.0, 60.0),
    };
    EmgLimits { excitation }
}

#[derive(Debug, Clone, Copy)]
pub struct PpgLimits {
    pub heart_rate: ParamRange,
    pub perfusion_index: ParamRange,
    pub dicrotic_notch: ParamRange,
    pub spo2: ParamRange,
    /// RR standard deviation as a fraction of the mean RR
    pub hrv_std: f32,
    /// Beat-to-beat coefficient of variation of the pulse amplitude
    pub pi_variation: f32,
    pub diastolic_ratio: f32,
}

pub fn ppg(condition: PpgCondition) -> PpgLimits {
    use PpgCondition::*;

    match condition {
        Normal => PpgLimits {
            heart_rate: ParamRange::new(60.0, 100.0, 75.0),
            perfusion_index: ParamRange::new(2.0, 5.0, 3.5),
            dicrotic_notch: ParamRange::new(0.1, 0.5, 0.25),
            spo2: ParamRange::new(95.0, 100.0, 98.0),
            hrv_std: 0.04,
            pi_variation: 0.05,
            diastolic_ratio: 0.4,
        },
        Arrhythmia => PpgLimits {
            heart_rate: ParamRange::new(60.0, 180.0, 90.0),
            perfusion_index: ParamRange::new(1.0, 5.0, 3.0),
            dicrotic_notch: ParamRange::new(0.05, 0.5, 0.2),
            spo2: ParamRange::new(92.0, 100.0, 97.0),
            hrv_std: 0.15,
            pi_variation: 0.15,
            diastolic_ratio: 0.4,
        },
        WeakPerfusion => PpgLimits {
            heart_rate: ParamRange::new(70.0, 120.0, 95.0),
            perfusion_index: ParamRange::new(0.1, 0.5, 0.3),
            dicrotic_notch: ParamRange::new(0.0, 0.2, 0.05),
            spo2: ParamRange::new(88.0, 98.0, 94.0),
            hrv_std: 0.04,
            pi_variation: 0.1,
            diastolic_ratio: 0.3,
        },
        StrongPerfusion => PpgLimits {
            heart_rate: ParamRange::new(60.0, 90.0, 70.0),
            perfusion_index: ParamRange::new(5.0, 20.0, 10.0),
            dicrotic_notch: ParamRange::new(0.2, 0.7, 0.35),
            spo2: ParamRange::new(96.0, 100.0, 99.0),
            hrv_std: 0.05,
            pi_variation: 0.05,
            diastolic_ratio: 0.45,
        },
        Vasoconstriction => PpgLimits {
            heart_rate: ParamRange::new(65.0, 110.0, 85.0),
            perfusion_index: ParamRange::new(0.2, 0.8, 0.5),
            dicrotic_notch: ParamRange::new(0.0, 0.1, 0.05),
            spo2: ParamRange::new(91.0, 100.0, 96.0),
            hrv_std: 0.03,
            pi_variation: 0.08,
            diastolic_ratio: 0.25,
        },
        LowSpO2 => PpgLimits {
            heart_rate: ParamRange::new(70.0, 120.0, 95.0),
            perfusion_index: ParamRange::new(0.5, 3.5, 2.0),
            dicrotic_notch: ParamRange::new(0.05, 0.4, 0.2),
            spo2: ParamRange::new(70.0, 90.0, 82.0),
            hrv_std: 0.05,
            pi_variation: 0.08,
            diastolic_ratio: 0.35,
        },
    }
}
