//! Lumped-parameter tubular motor model.
//!
//! Closed-form stand-in for the field solver: a slotless tubular stator with
//! three phase coils over a radially magnetized armature. Force, voltage,
//! current, inductance and power follow smoothly from the candidate geometry,
//! which is enough to drive the search end to end and to test the pipeline
//! without a finite-element backend.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::schema::{Channel, MotorParameters};

use super::simulator::{ChannelValues, PhaseCurrents, Simulator, SimulatorError};

const MU_0: f64 = 4.0e-7 * PI;

/// Fixed material and construction constants of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorConstants {
    /// Magnet remanence (T).
    #[serde(default = "default_remanence")]
    pub remanence: f64,
    /// Radial magnet thickness (mm).
    #[serde(default = "default_magnet_thickness")]
    pub magnet_thickness: f64,
    /// Mechanical air gap (mm).
    #[serde(default = "default_air_gap")]
    pub air_gap: f64,
    /// Inner coil radius (mm).
    #[serde(default = "default_bore_radius")]
    pub bore_radius: f64,
    /// Coils in series per phase.
    #[serde(default = "default_slots_per_phase")]
    pub slots_per_phase: usize,
    /// Copper fill factor of a slot.
    #[serde(default = "default_fill_factor")]
    pub fill_factor: f64,
    /// Conductor resistivity (Ohm m).
    #[serde(default = "default_resistivity")]
    pub resistivity: f64,
    /// Detent force coefficient (N per T mm of spacing).
    #[serde(default = "default_cogging")]
    pub cogging: f64,
}

impl Default for MotorConstants {
    fn default() -> Self {
        Self {
            remanence: default_remanence(),
            magnet_thickness: default_magnet_thickness(),
            air_gap: default_air_gap(),
            bore_radius: default_bore_radius(),
            slots_per_phase: default_slots_per_phase(),
            fill_factor: default_fill_factor(),
            resistivity: default_resistivity(),
            cogging: default_cogging(),
        }
    }
}

fn default_remanence() -> f64 {
    1.2
}
fn default_magnet_thickness() -> f64 {
    3.0
}
fn default_air_gap() -> f64 {
    0.5
}
fn default_bore_radius() -> f64 {
    5.0
}
fn default_slots_per_phase() -> usize {
    2
}
fn default_fill_factor() -> f64 {
    0.5
}
fn default_resistivity() -> f64 {
    1.72e-8
}
fn default_cogging() -> f64 {
    0.05
}

/// Quantities derived once per configured candidate.
#[derive(Debug, Clone, Copy)]
struct Derived {
    /// Turns per coil.
    turns: f64,
    /// Phase resistance (Ohm).
    resistance: f64,
    /// Force constant (N/A).
    force_constant: f64,
    /// Mean phase inductance (H).
    inductance: f64,
    /// Detent force amplitude (N).
    cogging: f64,
    /// Pole pitch (mm).
    pole_pitch: f64,
    /// Electrical offset of the coil pattern (rad).
    phase_shift: f64,
}

/// Analytic motor implementing [`Simulator`].
#[derive(Debug, Clone, Default)]
pub struct AnalyticMotor {
    constants: MotorConstants,
    derived: Option<Derived>,
    currents: PhaseCurrents,
    displacement: f64,
}

impl AnalyticMotor {
    pub fn new(constants: MotorConstants) -> Self {
        Self {
            constants,
            derived: None,
            currents: [0.0; 3],
            displacement: 0.0,
        }
    }

    /// Turns per coil, if configured.
    pub fn turns(&self) -> Option<f64> {
        self.derived.map(|d| d.turns)
    }

    /// Phase resistance, if configured.
    pub fn resistance(&self) -> Option<f64> {
        self.derived.map(|d| d.resistance)
    }

    fn derive(&self, params: &MotorParameters) -> Result<Derived, SimulatorError> {
        let c = &self.constants;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(params.slot_thickness)
            && positive(params.slot_axial_length)
            && positive(params.slot_axial_spacing)
            && positive(params.wire_diameter))
        {
            return Err(SimulatorError::Setup(format!("degenerate geometry: {}", params)));
        }
        if let Some(back_iron) = params.back_iron_thickness
            && !positive(back_iron)
        {
            return Err(SimulatorError::Setup(format!(
                "back iron thickness must be positive, got {}",
                back_iron
            )));
        }

        let wire_area_mm2 = PI * params.wire_diameter.powi(2) / 4.0;
        let slot_area_mm2 = params.slot_thickness * params.slot_axial_length;
        let turns = (c.fill_factor * slot_area_mm2 / wire_area_mm2).floor().max(1.0);

        let mean_radius_m = (c.bore_radius + 0.5 * params.slot_thickness) * 1e-3;
        let mean_turn_m = TAU * mean_radius_m;
        let coils = c.slots_per_phase as f64;
        let resistance = c.resistivity * turns * mean_turn_m * coils / (wire_area_mm2 * 1e-6);

        // Back iron closes the magnetic circuit and lifts the gap flux.
        let iron_factor = match params.back_iron_thickness {
            Some(b) => 0.6 + 0.4 * (1.0 - (-b / c.magnet_thickness).exp()),
            None => 0.6,
        };
        let magnetic_gap = c.magnet_thickness + c.air_gap + params.slot_thickness;
        let flux_density = c.remanence * c.magnet_thickness / magnetic_gap * iron_factor;
        let force_constant = flux_density * turns * coils * mean_turn_m;

        let coil_length_m = (params.slot_axial_length + c.air_gap) * 1e-3;
        let core_area_m2 = PI * mean_radius_m.powi(2);
        let inductance =
            MU_0 * turns.powi(2) * core_area_m2 / coil_length_m * coils * (1.0 + iron_factor);

        let slot_pitch = params.slot_axial_length + params.slot_axial_spacing;
        let pole_pitch = 1.5 * slot_pitch;
        let phase_shift = PI * params.slot_axial_spacing / pole_pitch;
        let cogging = c.cogging * flux_density * params.slot_axial_spacing;

        Ok(Derived {
            turns,
            resistance,
            force_constant,
            inductance,
            cogging,
            pole_pitch,
            phase_shift,
        })
    }
}

impl Simulator for AnalyticMotor {
    fn configure(&mut self, params: &MotorParameters) -> Result<(), SimulatorError> {
        self.derived = Some(self.derive(params)?);
        self.currents = [0.0; 3];
        self.displacement = 0.0;
        log::trace!("configured analytic motor: {}", params);
        Ok(())
    }

    fn set_currents(&mut self, currents: PhaseCurrents) -> Result<(), SimulatorError> {
        if self.derived.is_none() {
            return Err(SimulatorError::NotConfigured);
        }
        self.currents = currents;
        Ok(())
    }

    fn step(&mut self, displacement: f64) -> Result<(), SimulatorError> {
        if self.derived.is_none() {
            return Err(SimulatorError::NotConfigured);
        }
        if !displacement.is_finite() {
            return Err(SimulatorError::Solve {
                displacement,
                reason: "non-finite displacement".to_string(),
            });
        }
        self.displacement = displacement;
        Ok(())
    }

    fn query(&mut self, channels: &[Channel]) -> Result<ChannelValues, SimulatorError> {
        let d = self.derived.ok_or(SimulatorError::NotConfigured)?;
        let theta = PI * self.displacement / d.pole_pitch;
        let shift = |p: usize| p as f64 * TAU / 3.0;

        let mut values = ChannelValues::new();
        for &channel in channels {
            let value = match channel {
                Channel::ForceLorentz => {
                    let thrust: f64 = self
                        .currents
                        .iter()
                        .enumerate()
                        .map(|(p, i)| i * (theta + d.phase_shift - shift(p)).cos())
                        .sum();
                    let axial = d.force_constant * thrust + d.cogging * (6.0 * theta).sin();
                    vec![axial, 0.0]
                }
                Channel::PhaseCurrent => self.currents.to_vec(),
                Channel::PhaseVoltage => {
                    self.currents.iter().map(|i| d.resistance * i).collect()
                }
                Channel::PhasePower => self
                    .currents
                    .iter()
                    .map(|i| d.resistance * i * i)
                    .collect(),
                Channel::PhaseInductance => (0..3)
                    .map(|p| d.inductance * (1.0 + 0.1 * (2.0 * theta - shift(p)).cos()))
                    .collect(),
            };
            values.insert(channel, value);
        }
        Ok(values)
    }

    fn period(&self) -> Option<f64> {
        self.derived.map(|d| 2.0 * d.pole_pitch)
    }
}
