//! Configuration types for motor simulation, alignment and sweep parameters.

use serde::{Deserialize, Serialize};

/// Output channel reported by the field simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Lorentz force on the moving group (N). First component is axial.
    ForceLorentz,
    /// Real power per phase (W).
    PhasePower,
    /// Terminal voltage per phase (V).
    PhaseVoltage,
    /// Current per phase (A).
    PhaseCurrent,
    /// Flux-linkage inductance per phase (H).
    PhaseInductance,
}

impl Channel {
    /// Every channel, in canonical order.
    pub const ALL: [Channel; 5] = [
        Channel::ForceLorentz,
        Channel::PhasePower,
        Channel::PhaseVoltage,
        Channel::PhaseCurrent,
        Channel::PhaseInductance,
    ];

    /// Channel key as it appears in simulator queries and output files.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::ForceLorentz => "force_lorentz",
            Channel::PhasePower => "phase_power",
            Channel::PhaseVoltage => "phase_voltage",
            Channel::PhaseCurrent => "phase_current",
            Channel::PhaseInductance => "phase_inductance",
        }
    }

    /// Whether values are indexed by phase.
    #[inline]
    pub fn is_per_phase(&self) -> bool {
        !matches!(self, Channel::ForceLorentz)
    }

    /// Channels whose absence invalidates a candidate outright.
    #[inline]
    pub fn is_safety_critical(&self) -> bool {
        matches!(self, Channel::PhaseVoltage | Channel::PhaseInductance)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Simulation settings shared by the phase aligner and the sweep engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of phase-offset probes during alignment.
    #[serde(default = "default_alignment_samples")]
    pub alignment_samples: usize,
    /// Number of displacement steps in one sweep.
    #[serde(default = "default_rotational_samples")]
    pub rotational_samples: usize,
    /// Peak phase current (A).
    #[serde(default = "default_current_amplitude")]
    pub current_amplitude: f64,
    /// Displacement of the reference position (mm).
    #[serde(default)]
    pub reference_displacement: f64,
    /// Sweep span (mm). Uses the simulator's electrical period when unset.
    #[serde(default)]
    pub sweep_span: Option<f64>,
    /// Channels collected at each sweep step.
    #[serde(default = "default_requested_outputs")]
    pub requested_outputs: Vec<Channel>,
    /// Simulator group id of the moving armature.
    #[serde(default = "default_moving_group")]
    pub moving_group: u32,
    /// Names of the three driven phases, in current-vector order.
    #[serde(default = "default_phases")]
    pub phases: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alignment_samples: default_alignment_samples(),
            rotational_samples: default_rotational_samples(),
            current_amplitude: default_current_amplitude(),
            reference_displacement: 0.0,
            sweep_span: None,
            requested_outputs: default_requested_outputs(),
            moving_group: default_moving_group(),
            phases: default_phases(),
        }
    }
}

fn default_alignment_samples() -> usize {
    20
}
fn default_rotational_samples() -> usize {
    20
}
fn default_current_amplitude() -> f64 {
    2.0
}
fn default_requested_outputs() -> Vec<Channel> {
    vec![
        Channel::ForceLorentz,
        Channel::PhasePower,
        Channel::PhaseVoltage,
        Channel::PhaseCurrent,
        Channel::PhaseInductance,
    ]
}
fn default_moving_group() -> u32 {
    1
}
fn default_phases() -> Vec<String> {
    vec![
        "phase_a".to_string(),
        "phase_b".to_string(),
        "phase_c".to_string(),
    ]
}

impl SimulationConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alignment_samples == 0 {
            return Err(ConfigError::InvalidSampleCount("alignment_samples"));
        }
        if self.rotational_samples == 0 {
            return Err(ConfigError::InvalidSampleCount("rotational_samples"));
        }
        if !(self.current_amplitude.is_finite() && self.current_amplitude > 0.0) {
            return Err(ConfigError::InvalidCurrent(self.current_amplitude));
        }
        if !self.reference_displacement.is_finite() {
            return Err(ConfigError::InvalidReference(self.reference_displacement));
        }
        if let Some(span) = self.sweep_span
            && !(span.is_finite() && span > 0.0)
        {
            return Err(ConfigError::InvalidSpan(span));
        }
        if self.phases.len() != 3 {
            return Err(ConfigError::InvalidPhaseCount(self.phases.len()));
        }
        for required in [
            Channel::ForceLorentz,
            Channel::PhaseVoltage,
            Channel::PhaseInductance,
        ] {
            if !self.requested_outputs.contains(&required) {
                return Err(ConfigError::MissingChannel(required));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    InvalidSampleCount(&'static str),
    #[error("Current amplitude must be positive, got {0}")]
    InvalidCurrent(f64),
    #[error("Reference displacement must be finite, got {0}")]
    InvalidReference(f64),
    #[error("Sweep span must be positive, got {0}")]
    InvalidSpan(f64),
    #[error("Exactly three phases are required, got {0}")]
    InvalidPhaseCount(usize),
    #[error("Requested outputs must include {0}")]
    MissingChannel(Channel),
}
