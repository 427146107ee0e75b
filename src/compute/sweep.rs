//! Rotational sweep: step the armature across one span with synchronized
//! phase currents and collect the requested channels at every step.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::schema::{Channel, SimulationConfig};

use super::simulator::{ChannelValues, Simulator, SimulatorError, three_phase_currents};

/// Channels collected at each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSelector {
    channels: Vec<Channel>,
}

impl OutputSelector {
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        let mut channels: Vec<Channel> = channels.into_iter().collect();
        channels.sort();
        channels.dedup();
        Self { channels }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.channels.binary_search(&channel).is_ok()
    }
}

impl Default for OutputSelector {
    fn default() -> Self {
        Self::new(Channel::ALL)
    }
}

/// Which simulator objects the sweep moves and reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSubjects {
    pub moving_group: u32,
    pub phases: Vec<String>,
}

impl SweepSubjects {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            moving_group: config.moving_group,
            phases: config.phases.clone(),
        }
    }
}

/// Channel readings at one displacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Absolute displacement (mm).
    pub displacement: f64,
    pub outputs: ChannelValues,
}

impl StepRecord {
    /// First component of a channel, if present.
    pub fn first(&self, channel: Channel) -> Option<f64> {
        self.outputs.get(&channel).and_then(|v| v.first().copied())
    }

    /// Full vector of a channel, if present.
    pub fn values(&self, channel: Channel) -> Option<&[f64]> {
        self.outputs.get(&channel).map(Vec::as_slice)
    }
}

/// Ordered step records of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub moving_group: u32,
    pub steps: Vec<StepRecord>,
}

impl SweepResult {
    pub fn empty(moving_group: u32) -> Self {
        Self {
            moving_group,
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Executes sweeps against a configured simulator.
#[derive(Debug, Clone)]
pub struct SweepEngine {
    selector: OutputSelector,
    subjects: SweepSubjects,
    samples: usize,
    current_amplitude: f64,
    reference: f64,
    span: Option<f64>,
}

impl SweepEngine {
    pub fn new(
        selector: OutputSelector,
        subjects: SweepSubjects,
        samples: usize,
        current_amplitude: f64,
        reference: f64,
        span: Option<f64>,
    ) -> Self {
        Self {
            selector,
            subjects,
            samples,
            current_amplitude,
            reference,
            span,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            OutputSelector::new(config.requested_outputs.iter().copied()),
            SweepSubjects::from_config(config),
            config.rotational_samples,
            config.current_amplitude,
            config.reference_displacement,
            config.sweep_span,
        )
    }

    /// Sweep, discarding everything on any solver error.
    pub fn sweep<S: Simulator + ?Sized>(&self, sim: &mut S, offset: f64) -> SweepResult {
        self.try_sweep(sim, offset).unwrap_or_else(|e| {
            log::debug!("sweep discarded: {}", e);
            SweepResult::empty(self.subjects.moving_group)
        })
    }

    /// Sweep, returning the first solver error instead of partial data.
    pub fn try_sweep<S: Simulator + ?Sized>(
        &self,
        sim: &mut S,
        offset: f64,
    ) -> Result<SweepResult, SimulatorError> {
        let mut result = SweepResult::empty(self.subjects.moving_group);
        if self.samples == 0 {
            return Ok(result);
        }

        let span = self
            .span
            .or_else(|| sim.period())
            .ok_or(SimulatorError::UnknownPeriod)?;
        let phase_count = self.subjects.phases.len();

        sim.step(self.reference)?;
        for k in 0..self.samples {
            let fraction = k as f64 / self.samples as f64;
            let displacement = self.reference + fraction * span;
            let angle = TAU * fraction + offset;

            sim.set_currents(three_phase_currents(self.current_amplitude, angle))?;
            sim.step(displacement)?;
            let outputs = sim.query(self.selector.channels())?;

            for (channel, values) in &outputs {
                if channel.is_per_phase() && values.len() != phase_count {
                    log::debug!(
                        "{} at {:.4}: {} values for {} phases",
                        channel,
                        displacement,
                        values.len(),
                        phase_count
                    );
                }
            }

            result.steps.push(StepRecord {
                displacement,
                outputs,
            });
        }
        sim.step(self.reference)?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::simulator::PhaseCurrents;
    use crate::schema::MotorParameters;

    #[derive(Default)]
    struct RecordingStub {
        steps: Vec<f64>,
        currents: Vec<PhaseCurrents>,
        fail_at_query: Option<usize>,
        queries: usize,
        short_voltage: bool,
    }

    impl Simulator for RecordingStub {
        fn configure(&mut self, _: &MotorParameters) -> Result<(), SimulatorError> {
            Ok(())
        }
        fn set_currents(&mut self, currents: PhaseCurrents) -> Result<(), SimulatorError> {
            self.currents.push(currents);
            Ok(())
        }
        fn step(&mut self, displacement: f64) -> Result<(), SimulatorError> {
            self.steps.push(displacement);
            Ok(())
        }
        fn query(&mut self, channels: &[Channel]) -> Result<ChannelValues, SimulatorError> {
            let n = self.queries;
            self.queries += 1;
            if self.fail_at_query == Some(n) {
                return Err(SimulatorError::Solve {
                    displacement: 0.0,
                    reason: "diverged".to_string(),
                });
            }
            Ok(channels
                .iter()
                .map(|&c| {
                    let width = match c {
                        Channel::ForceLorentz => 2,
                        Channel::PhaseVoltage if self.short_voltage => 2,
                        _ => 3,
                    };
                    (c, vec![1.0; width])
                })
                .collect())
        }
        fn period(&self) -> Option<f64> {
            Some(12.0)
        }
    }

    fn engine(samples: usize, span: Option<f64>) -> SweepEngine {
        SweepEngine::from_config(&SimulationConfig {
            rotational_samples: samples,
            reference_displacement: 1.0,
            sweep_span: span,
            ..Default::default()
        })
    }

    #[test]
    fn test_step_positions_and_return() {
        let mut sim = RecordingStub::default();
        let result = engine(4, Some(8.0)).sweep(&mut sim, 0.0);
        assert_eq!(result.len(), 4);
        let displacements: Vec<f64> = result.steps.iter().map(|s| s.displacement).collect();
        assert_eq!(displacements, vec![1.0, 3.0, 5.0, 7.0]);
        // Reference, four steps, reference.
        assert_eq!(sim.steps, vec![1.0, 1.0, 3.0, 5.0, 7.0, 1.0]);
    }

    #[test]
    fn test_span_defaults_to_period() {
        let mut sim = RecordingStub::default();
        let result = engine(4, None).sweep(&mut sim, 0.0);
        assert_eq!(result.steps[1].displacement, 4.0);
    }

    #[test]
    fn test_currents_include_offset() {
        let mut sim = RecordingStub::default();
        engine(2, Some(8.0)).sweep(&mut sim, 0.25);
        let expected = three_phase_currents(2.0, 0.25);
        assert_eq!(sim.currents[0], expected);
        let expected = three_phase_currents(2.0, std::f64::consts::PI + 0.25);
        assert_eq!(sim.currents[1], expected);
    }

    #[test]
    fn test_zero_samples_empty() {
        let mut sim = RecordingStub::default();
        let result = engine(0, Some(8.0)).sweep(&mut sim, 0.0);
        assert!(result.is_empty());
        assert!(sim.steps.is_empty());
    }

    #[test]
    fn test_solver_error_discards_sweep() {
        let mut sim = RecordingStub {
            fail_at_query: Some(2),
            ..Default::default()
        };
        let engine = engine(4, Some(8.0));
        assert!(engine.try_sweep(&mut sim, 0.0).is_err());

        let mut sim = RecordingStub {
            fail_at_query: Some(2),
            ..Default::default()
        };
        assert!(engine.sweep(&mut sim, 0.0).is_empty());
    }

    #[test]
    fn test_short_phase_channel_kept() {
        let mut sim = RecordingStub {
            short_voltage: true,
            ..Default::default()
        };
        let result = engine(1, Some(8.0)).sweep(&mut sim, 0.0);
        let step = &result.steps[0];
        assert_eq!(step.values(Channel::PhaseVoltage), Some(&[1.0, 1.0][..]));
        assert_eq!(step.values(Channel::ForceLorentz).map(<[f64]>::len), Some(2));
        assert_eq!(step.values(Channel::PhaseCurrent).map(<[f64]>::len), Some(3));
    }

    #[test]
    fn test_selector_dedups() {
        let selector = OutputSelector::new([
            Channel::PhasePower,
            Channel::ForceLorentz,
            Channel::PhasePower,
        ]);
        assert_eq!(
            selector.channels(),
            &[Channel::ForceLorentz, Channel::PhasePower]
        );
        assert!(!selector.contains(Channel::PhaseVoltage));
    }
}
