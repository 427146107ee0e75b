//! Phase alignment: find the current-vector offset that maximizes thrust.

use std::f64::consts::TAU;

use crate::schema::{Channel, SimulationConfig};

use super::simulator::{Simulator, SimulatorError, three_phase_currents};

/// Alignment failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlignmentError {
    #[error("Alignment requires at least one probe sample")]
    InvalidSampleCount,
    #[error("All {attempts} alignment probes failed, last error: {last_error}")]
    NoSuccessfulProbe {
        attempts: usize,
        last_error: SimulatorError,
    },
}

/// Probes evenly spaced electrical offsets at the reference position.
#[derive(Debug, Clone)]
pub struct PhaseAligner {
    samples: usize,
    current_amplitude: f64,
    reference: f64,
}

impl PhaseAligner {
    pub fn new(samples: usize, current_amplitude: f64, reference: f64) -> Self {
        Self {
            samples,
            current_amplitude,
            reference,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.alignment_samples,
            config.current_amplitude,
            config.reference_displacement,
        )
    }

    /// Offset (rad) in `[0, 2pi)` giving the largest absolute axial force.
    ///
    /// Failing probes are skipped. Ties keep the earliest offset.
    pub fn align<S: Simulator + ?Sized>(&self, sim: &mut S) -> Result<f64, AlignmentError> {
        if self.samples == 0 {
            return Err(AlignmentError::InvalidSampleCount);
        }

        let mut best: Option<(f64, f64)> = None;
        let mut last_error = None;

        for j in 0..self.samples {
            let offset = TAU * j as f64 / self.samples as f64;
            match self.probe(sim, offset) {
                Ok(force) => {
                    let magnitude = force.abs();
                    if best.is_none_or(|(_, b)| magnitude > b) {
                        best = Some((offset, magnitude));
                    }
                }
                Err(e) => {
                    log::debug!("alignment probe at {:.4} rad failed: {}", offset, e);
                    last_error = Some(e);
                }
            }
        }

        match (best, last_error) {
            (Some((offset, _)), _) => Ok(offset),
            (None, Some(last_error)) => Err(AlignmentError::NoSuccessfulProbe {
                attempts: self.samples,
                last_error,
            }),
            (None, None) => Err(AlignmentError::InvalidSampleCount),
        }
    }

    fn probe<S: Simulator + ?Sized>(&self, sim: &mut S, offset: f64) -> Result<f64, SimulatorError> {
        sim.set_currents(three_phase_currents(self.current_amplitude, offset))?;
        sim.step(self.reference)?;
        let values = sim.query(&[Channel::ForceLorentz])?;
        values
            .get(&Channel::ForceLorentz)
            .and_then(|f| f.first().copied())
            .filter(|f| f.is_finite())
            .ok_or(SimulatorError::MissingChannel(Channel::ForceLorentz))
    }
}
