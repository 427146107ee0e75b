//! Boundary to the field simulator.
//!
//! The evaluation pipeline only talks to a [`Simulator`]: configure the
//! geometry, drive phase currents, move the armature and query channels.
//! The solver behind it is opaque.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use crate::schema::{Channel, MotorParameters};

/// Peak current per phase (A), in phase order.
pub type PhaseCurrents = [f64; 3];

/// Queried channel values. Per-phase channels hold one value per phase;
/// `force_lorentz` holds the force vector with the axial component first.
pub type ChannelValues = BTreeMap<Channel, Vec<f64>>;

/// Simulator failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulatorError {
    #[error("Simulator setup failed: {0}")]
    Setup(String),
    #[error("Solve failed at displacement {displacement}: {reason}")]
    Solve { displacement: f64, reason: String },
    #[error("Simulator does not provide channel {0}")]
    MissingChannel(Channel),
    #[error("Simulator used before configure")]
    NotConfigured,
    #[error("Sweep span not configured and simulator has no electrical period")]
    UnknownPeriod,
}

/// Opaque field solver driven by the pipeline.
pub trait Simulator {
    /// Build the motor model for a candidate.
    fn configure(&mut self, params: &MotorParameters) -> Result<(), SimulatorError>;

    /// Set the drive current of every phase.
    fn set_currents(&mut self, currents: PhaseCurrents) -> Result<(), SimulatorError>;

    /// Move the armature to `displacement` (mm) from the reference position.
    fn step(&mut self, displacement: f64) -> Result<(), SimulatorError>;

    /// Solve at the current state and read the requested channels.
    fn query(&mut self, channels: &[Channel]) -> Result<ChannelValues, SimulatorError>;

    /// Electrical period (mm) of the configured motor, if known.
    fn period(&self) -> Option<f64> {
        None
    }
}

/// Builds a fresh simulator for every evaluation.
pub trait SimulatorFactory {
    type Sim: Simulator;

    fn create(&self) -> Result<Self::Sim, SimulatorError>;
}

impl<S, F> SimulatorFactory for F
where
    S: Simulator,
    F: Fn() -> Result<S, SimulatorError>,
{
    type Sim = S;

    fn create(&self) -> Result<S, SimulatorError> {
        self()
    }
}

/// Balanced three-phase currents at electrical angle `angle` (rad).
///
/// Phase `p` carries `amplitude * cos(angle - p * 2pi/3)`.
pub fn three_phase_currents(amplitude: f64, angle: f64) -> PhaseCurrents {
    std::array::from_fn(|p| amplitude * (angle - p as f64 * TAU / 3.0).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_phase_balanced() {
        for k in 0..12 {
            let angle = k as f64 * 0.5;
            let currents = three_phase_currents(2.0, angle);
            let sum: f64 = currents.iter().sum();
            assert!(sum.abs() < 1e-12);
        }
    }

    #[test]
    fn test_three_phase_at_zero() {
        let currents = three_phase_currents(2.0, 0.0);
        assert!((currents[0] - 2.0).abs() < 1e-12);
        assert!((currents[1] + 1.0).abs() < 1e-12);
        assert!((currents[2] + 1.0).abs() < 1e-12);
    }
}
