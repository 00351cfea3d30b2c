// src/models/params.rs
//! Signal kinds, pathology tags and per-kind parameter records

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::models::limits;

/// Which model drives the output; exactly one is active at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    #[default]
    None,
    Ecg,
    Emg,
    Ppg,
}

impl SignalKind {
    /// Kinds that can actually be started
    pub const ACTIVE: [SignalKind; 3] = [SignalKind::Ecg, SignalKind::Emg, SignalKind::Ppg];

    /// Mixed into the engine seed so each kind draws its own sequence
    pub(crate) fn seed_salt(self) -> u64 {
        match self {
            SignalKind::None => 0,
            SignalKind::Ecg => 0x9E37_79B9_7F4A_7C15,
            SignalKind::Emg => 0xC2B2_AE3D_27D4_EB4F,
            SignalKind::Ppg => 0x1656_67B1_9E37_79F9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcgCondition {
    #[default]
    Normal,
    Tachycardia,
    Bradycardia,
    AtrialFibrillation,
    VentricularFibrillation,
    PrematureVentricular,
    StElevation,
    StDepression,
}

impl EcgCondition {
    pub const ALL: [EcgCondition; 8] = [
        EcgCondition::Normal,
        EcgCondition::Tachycardia,
        EcgCondition::Bradycardia,
        EcgCondition::AtrialFibrillation,
        EcgCondition::VentricularFibrillation,
        EcgCondition::PrematureVentricular,
        EcgCondition::StElevation,
        EcgCondition::StDepression,
    ];
}

/// Limb lead the output is projected onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EcgLead {
    I,
    #[default]
    II,
    III,
}

impl EcgLead {
    pub fn gain(self) -> f32 {
        match self {
            EcgLead::I => 0.6,
            EcgLead::II => 1.0,
            EcgLead::III => 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcgParameters {
    pub heart_rate_bpm: f32,
    pub p_amplitude: f32,
    pub qrs_amplitude: f32,
    pub t_amplitude: f32,
    /// ST-segment shift in mV
    pub st_shift_mv: f32,
    /// 0..=1
    pub noise_level: f32,
    pub lead: EcgLead,
    pub condition: EcgCondition,
}

impl EcgParameters {
    pub fn for_condition(condition: EcgCondition) -> Self {
        let limits = limits::ecg(condition);
        Self {
            heart_rate_bpm: limits.heart_rate.default,
            p_amplitude: limits.p_amplitude.default,
            qrs_amplitude: 1.0,
            t_amplitude: limits.t_amplitude.default,
            st_shift_mv: limits.st_shift.default,
            noise_level: limits::NOISE.default,
            lead: EcgLead::default(),
            condition,
        }
    }

    /// Reject non-finite fields, then clamp into the condition's ranges
    pub fn validated(self) -> SimResult<Self> {
        check_finite(&[
            ("heart_rate_bpm", self.heart_rate_bpm),
            ("p_amplitude", self.p_amplitude),
            ("qrs_amplitude", self.qrs_amplitude),
            ("t_amplitude", self.t_amplitude),
            ("st_shift_mv", self.st_shift_mv),
            ("noise_level", self.noise_level),
        ])?;
        Ok(self.clamped())
    }

    pub fn clamped(self) -> Self {
        let limits = limits::ecg(self.condition);
        Self {
            heart_rate_bpm: limits.heart_rate.clamp(self.heart_rate_bpm),
            p_amplitude: limits.p_amplitude.clamp(self.p_amplitude),
            qrs_amplitude: limits::QRS_AMPLITUDE.clamp(self.qrs_amplitude),
            t_amplitude: limits.t_amplitude.clamp(self.t_amplitude),
            st_shift_mv: limits.st_shift.clamp(self.st_shift_mv),
            noise_level: limits::NOISE.clamp(self.noise_level),
            ..self
        }
    }
}

impl Default for EcgParameters {
    fn default() -> Self {
        Self::for_condition(EcgCondition::Normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmgCondition {
    #[default]
    Rest,
    LowContraction,
    ModerateContraction,
    HighContraction,
    Tremor,
    Myopathy,
    Neuropathy,
    Fasciculation,
    Fatigue,
}

impl EmgCondition {
    pub const ALL: [EmgCondition; 9] = [
        EmgCondition::Rest,
        EmgCondition::LowContraction,
        EmgCondition::ModerateContraction,
        EmgCondition::HighContraction,
        EmgCondition::Tremor,
        EmgCondition::Myopathy,
        EmgCondition::Neuropathy,
        EmgCondition::Fasciculation,
        EmgCondition::Fatigue,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmgParameters {
    /// Excitation in percent of MVC, 0..=100
    pub excitation_percent: f32,
    /// Output gain applied to the summed potentials
    pub amplitude: f32,
    pub noise_level: f32,
    pub condition: EmgCondition,
}

impl EmgParameters {
    pub fn for_condition(condition: EmgCondition) -> Self {
        let limits = limits::emg(condition);
        Self {
            excitation_percent: limits.excitation.default,
            amplitude: limits::EMG_AMPLITUDE.default,
            noise_level: limits::NOISE.default,
            condition,
        }
    }

    pub fn validated(self) -> SimResult<Self> {
        check_finite(&[
            ("excitation_percent", self.excitation_percent),
            ("amplitude", self.amplitude),
            ("noise_level", self.noise_level),
        ])?;
        Ok(self.clamped())
    }

    pub fn clamped(self) -> Self {
        let limits = limits::emg(self.condition);
        Self {
            excitation_percent: limits.excitation.clamp(self.excitation_percent),
            amplitude: limits::EMG_AMPLITUDE.clamp(self.amplitude),
            noise_level: limits::NOISE.clamp(self.noise_level),
            ..self
        }
    }
}

impl Default for EmgParameters {
    fn default() -> Self {
        Self::for_condition(EmgCondition::Rest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PpgCondition {
    #[default]
    Normal,
    Arrhythmia,
    WeakPerfusion,
    StrongPerfusion,
    Vasoconstriction,
    LowSpO2,
}

impl PpgCondition {
    pub const ALL: [PpgCondition; 6] = [
        PpgCondition::Normal,
        PpgCondition::Arrhythmia,
        PpgCondition::WeakPerfusion,
        PpgCondition::StrongPerfusion,
        PpgCondition::Vasoconstriction,
        PpgCondition::LowSpO2,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PpgParameters {
    pub heart_rate_bpm: f32,
    /// Perfusion index in percent
    pub perfusion_index: f32,
    /// Notch depth relative to the systolic peak, 0..=0.7
    pub dicrotic_notch: f32,
    /// Oxygen saturation proxy in percent
    pub spo2_percent: f32,
    pub noise_level: f32,
    pub condition: PpgCondition,
}

impl PpgParameters {
    pub fn for_condition(condition: PpgCondition) -> Self {
        let limits = limits::ppg(condition);
        Self {
            heart_rate_bpm: limits.heart_rate.default,
            perfusion_index: limits.perfusion_index.default,
            dicrotic_notch: limits.dicrotic_notch.default,
            spo2_percent: limits.spo2.default,
            noise_level: limits::NOISE.default,
            condition,
        }
    }

    pub fn validated(self) -> SimResult<Self> {
        check_finite(&[
            ("heart_rate_bpm", self.heart_rate_bpm),
            ("perfusion_index", self.perfusion_index),
            ("dicrotic_notch", self.dicrotic_notch),
            ("spo2_percent", self.spo2_percent),
            ("noise_level", self.noise_level),
        ])?;
        Ok(self.clamped())
    }

    pub fn clamped(self) -> Self {
        let limits = limits::ppg(self.condition);
        Self {
            heart_rate_bpm: limits.heart_rate.clamp(self.heart_rate_bpm),
            perfusion_index: limits.perfusion_index.clamp(self.perfusion_index),
            dicrotic_notch: limits.dicrotic_notch.clamp(self.dicrotic_notch),
            spo2_percent: limits.spo2.clamp(self.spo2_percent),
            noise_level: limits::NOISE.clamp(self.noise_level),
            ..self
        }
    }
}

impl Default for PpgParameters {
    fn default() -> Self {
        Self::for_condition(PpgCondition::Normal)
    }
}

/// Immutable parameter value for one signal kind.
///
/// The engine swaps whole sets behind an `Arc`, so readers always see a
/// complete set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParameterSet {
    Ecg(EcgParameters),
    Emg(EmgParameters),
    Ppg(PpgParameters),
}

impl ParameterSet {
    pub fn kind(&self) -> SignalKind {
        match self {
            ParameterSet::Ecg(_) => SignalKind::Ecg,
            ParameterSet::Emg(_) => SignalKind::Emg,
            ParameterSet::Ppg(_) => SignalKind::Ppg,
        }
    }

    pub fn defaults_for(kind: SignalKind) -> Option<Self> {
        match kind {
            SignalKind::Ecg => Some(ParameterSet::Ecg(EcgParameters::default())),
            SignalKind::Emg => Some(ParameterSet::Emg(EmgParameters::default())),
            SignalKind::Ppg => Some(ParameterSet::Ppg(PpgParameters::default())),
            SignalKind::None => None,
        }
    }

    pub fn validated(self) -> SimResult<Self> {
        Ok(match self {
            ParameterSet::Ecg(p) => ParameterSet::Ecg(p.validated()?),
            ParameterSet::Emg(p) => ParameterSet::Emg(p.validated()?),
            ParameterSet::Ppg(p) => ParameterSet::Ppg(p.validated()?),
        })
    }

    pub fn noise_level(&self) -> f32 {
        match self {
            ParameterSet::Ecg(p) => p.noise_level,
            ParameterSet::Emg(p) => p.noise_level,
            ParameterSet::Ppg(p) => p.noise_level,
        }
    }

    /// Copy with a different noise level
    pub fn with_noise_level(self, level: f32) -> Self {
        match self {
            ParameterSet::Ecg(p) => ParameterSet::Ecg(EcgParameters { noise_level: level, ..p }),
            ParameterSet::Emg(p) => ParameterSet::Emg(EmgParameters { noise_level: level, ..p }),
            ParameterSet::Ppg(p) => ParameterSet::Ppg(PpgParameters { noise_level: level, ..p }),
        }
    }

    /// Copy with a different primary amplitude: QRS factor for ECG, output
    /// gain for EMG, perfusion index for PPG
    pub fn with_amplitude(self, amplitude: f32) -> Self {
        match self {
            ParameterSet::Ecg(p) => ParameterSet::Ecg(EcgParameters { qrs_amplitude: amplitude, ..p }),
            ParameterSet::Emg(p) => ParameterSet::Emg(EmgParameters { amplitude, ..p }),
            ParameterSet::Ppg(p) => ParameterSet::Ppg(PpgParameters { perfusion_index: amplitude, ..p }),
        }
    }
}

fn check_finite(fields: &[(&'static str, f32)]) -> SimResult<()> {
    match fields.iter().find(|(_, value)| !value.is_finite()) {
        Some(&(field, value)) => Err(SimError::non_finite(field, value)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_kind() {
        for kind in SignalKind::ACTIVE {
            assert_eq!(ParameterSet::defaults_for(kind).unwrap().kind(), kind);
        }
        assert!(ParameterSet::defaults_for(SignalKind::None).is_none());
    }

    #[test]
    fn test_clamping_into_condition_range() {
        let p = EcgParameters {
            heart_rate_bpm: 400.0,
            ..EcgParameters::for_condition(EcgCondition::Bradycardia)
        }
        .validated()
        .unwrap();
        assert!(p.heart_rate_bpm <= 59.0);

        let e = EmgParameters {
            excitation_percent: 250.0,
            ..EmgParameters::for_condition(EmgCondition::HighContraction)
        }
        .validated()
        .unwrap();
        assert_eq!(e.excitation_percent, 100.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let p = PpgParameters {
            spo2_percent: f32::NAN,
            ..PpgParameters::default()
        };
        assert!(matches!(
            p.validated(),
            Err(SimError::InvalidParameter { field: "spo2_percent", .. })
        ));
    }

    #[test]
    fn test_amplitude_and_noise_helpers() {
        let set = ParameterSet::Emg(EmgParameters::default())
            .with_amplitude(2.0)
            .with_noise_level(0.3);
        match set {
            ParameterSet::Emg(p) => {
                assert_eq!(p.amplitude, 2.0);
                assert_eq!(p.noise_level, 0.3);
            }
            _ => unreachable!(),
        }
        assert_eq!(set.noise_level(), 0.3);
    }

    #[test]
    fn test_parameter_set_toml_shape() {
        let set = ParameterSet::Ppg(PpgParameters::default());
        let text = toml::to_string(&set).unwrap();
        assert!(text.contains("kind = \"ppg\""));
        let back: ParameterSet = toml::from_str(&text).unwrap();
        assert_eq!(back, set);
    }
}
