//! Hard electrical limits applied while a sweep is reduced to metrics.

use crate::compute::StepRecord;
use crate::schema::{Channel, ConstraintLimits};

use super::fitness::MotorMetrics;

/// First limit a candidate broke. An outcome, not a failure: the candidate
/// still completes with the sentinel fitness.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstraintViolation {
    #[error("phase {phase} voltage {value:.4} V exceeds {limit} V at step {step}")]
    Voltage {
        step: usize,
        phase: usize,
        value: f64,
        limit: f64,
    },
    #[error("phase {phase} inductance {value:.6} H exceeds {limit} H at step {step}")]
    Inductance {
        step: usize,
        phase: usize,
        value: f64,
        limit: f64,
    },
    #[error("power {value:.4} W exceeds {limit} W at step {step}")]
    Power { step: usize, value: f64, limit: f64 },
    #[error("{channel} missing at step {step}")]
    MissingChannel { step: usize, channel: Channel },
    #[error("resistance {value:.4} Ohm exceeds {limit} Ohm")]
    Resistance { value: f64, limit: f64 },
    #[error("ripple {value:.4} N exceeds {limit} N")]
    Ripple { value: f64, limit: f64 },
}

impl ConstraintViolation {
    /// Channel or metric that tripped the gate.
    pub fn subject(&self) -> &'static str {
        match self {
            ConstraintViolation::Voltage { .. } => Channel::PhaseVoltage.name(),
            ConstraintViolation::Inductance { .. } => Channel::PhaseInductance.name(),
            ConstraintViolation::Power { .. } => Channel::PhasePower.name(),
            ConstraintViolation::MissingChannel { channel, .. } => channel.name(),
            ConstraintViolation::Resistance { .. } => "resistance",
            ConstraintViolation::Ripple { .. } => "ripple",
        }
    }
}

/// Checks steps and reduced metrics against [`ConstraintLimits`].
#[derive(Debug, Clone)]
pub struct ConstraintGate {
    limits: ConstraintLimits,
}

impl ConstraintGate {
    pub fn new(limits: ConstraintLimits) -> Self {
        Self { limits }
    }

    /// Values of `channel` at this step. Only safety-critical channels are
    /// required.
    fn lookup<'a>(
        step: usize,
        record: &'a StepRecord,
        channel: Channel,
    ) -> Result<Option<&'a [f64]>, ConstraintViolation> {
        match record.values(channel) {
            None if channel.is_safety_critical() => {
                Err(ConstraintViolation::MissingChannel { step, channel })
            }
            values => Ok(values),
        }
    }

    /// Check one step: voltage, then inductance, then summed power.
    pub fn check_step(&self, step: usize, record: &StepRecord) -> Result<(), ConstraintViolation> {
        let voltage = Self::lookup(step, record, Channel::PhaseVoltage)?.unwrap_or_default();
        let limit = self.limits.max_voltage;
        if let Some((phase, &v)) = voltage.iter().enumerate().find(|(_, v)| v.abs() > limit) {
            return Err(ConstraintViolation::Voltage {
                step,
                phase,
                value: v,
                limit,
            });
        }

        let inductance =
            Self::lookup(step, record, Channel::PhaseInductance)?.unwrap_or_default();
        let limit = self.limits.max_inductance;
        if let Some((phase, &l)) = inductance.iter().enumerate().find(|(_, l)| **l > limit) {
            return Err(ConstraintViolation::Inductance {
                step,
                phase,
                value: l,
                limit,
            });
        }

        if let Some(power) = Self::lookup(step, record, Channel::PhasePower)? {
            let total: f64 = power.iter().sum();
            if total > self.limits.max_power {
                return Err(ConstraintViolation::Power {
                    step,
                    value: total,
                    limit: self.limits.max_power,
                });
            }
        }

        Ok(())
    }

    /// Check the optional ceilings on reduced metrics.
    pub fn check_metrics(&self, metrics: &MotorMetrics) -> Result<(), ConstraintViolation> {
        if let Some(limit) = self.limits.max_resistance
            && metrics.resistance > limit
        {
            return Err(ConstraintViolation::Resistance {
                value: metrics.resistance,
                limit,
            });
        }
        if let Some(limit) = self.limits.max_ripple
            && metrics.ripple > limit
        {
            return Err(ConstraintViolation::Ripple {
                value: metrics.ripple,
                limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ChannelValues;

    fn step(voltage: [f64; 3], inductance: [f64; 3], power: [f64; 3]) -> StepRecord {
        StepRecord {
            displacement: 0.0,
            outputs: ChannelValues::from([
                (Channel::PhaseVoltage, voltage.to_vec()),
                (Channel::PhaseInductance, inductance.to_vec()),
                (Channel::PhasePower, power.to_vec()),
            ]),
        }
    }

    fn gate() -> ConstraintGate {
        ConstraintGate::new(ConstraintLimits::default())
    }

    #[test]
    fn test_within_limits() {
        let record = step([10.0, -10.0, 0.0], [0.001; 3], [5.0; 3]);
        assert!(gate().check_step(0, &record).is_ok());
    }

    #[test]
    fn test_negative_voltage_checked_by_magnitude() {
        let record = step([1.0, -40.0, 0.0], [0.001; 3], [5.0; 3]);
        assert_eq!(
            gate().check_step(3, &record),
            Err(ConstraintViolation::Voltage {
                step: 3,
                phase: 1,
                value: -40.0,
                limit: 35.0,
            })
        );
    }

    #[test]
    fn test_voltage_checked_before_inductance() {
        let record = step([50.0, 0.0, 0.0], [1.0; 3], [500.0; 3]);
        let violation = gate().check_step(0, &record).unwrap_err();
        assert_eq!(violation.subject(), "phase_voltage");
    }

    #[test]
    fn test_power_is_summed() {
        // Each phase is under the ceiling, their sum is not.
        let record = step([1.0; 3], [0.001; 3], [40.0; 3]);
        assert!(matches!(
            gate().check_step(0, &record),
            Err(ConstraintViolation::Power { value, .. }) if value == 120.0
        ));
    }

    #[test]
    fn test_single_power_value_checked() {
        let mut record = step([1.0; 3], [0.001; 3], [0.0; 3]);
        record.outputs.insert(Channel::PhasePower, vec![500.0]);
        assert_eq!(
            gate().check_step(0, &record),
            Err(ConstraintViolation::Power {
                step: 0,
                value: 500.0,
                limit: 100.0,
            })
        );
    }

    #[test]
    fn test_missing_power_allowed() {
        let mut record = step([1.0; 3], [0.001; 3], [1.0; 3]);
        record.outputs.remove(&Channel::PhasePower);
        assert!(gate().check_step(0, &record).is_ok());
    }

    #[test]
    fn test_missing_voltage() {
        let mut record = step([1.0; 3], [0.001; 3], [1.0; 3]);
        record.outputs.remove(&Channel::PhaseVoltage);
        assert_eq!(
            gate().check_step(1, &record),
            Err(ConstraintViolation::MissingChannel {
                step: 1,
                channel: Channel::PhaseVoltage,
            })
        );
    }

    #[test]
    fn test_missing_inductance() {
        let mut record = step([1.0; 3], [0.001; 3], [1.0; 3]);
        record.outputs.remove(&Channel::PhaseInductance);
        assert_eq!(
            gate().check_step(2, &record),
            Err(ConstraintViolation::MissingChannel {
                step: 2,
                channel: Channel::PhaseInductance,
            })
        );
    }

    #[test]
    fn test_optional_ceilings_disabled_by_default() {
        let metrics = MotorMetrics {
            ripple: 1e3,
            resistance: 1e3,
            ..Default::default()
        };
        assert!(gate().check_metrics(&metrics).is_ok());

        let gate = ConstraintGate::new(ConstraintLimits {
            max_ripple: Some(1.0),
            ..Default::default()
        });
        assert!(matches!(
            gate.check_metrics(&metrics),
            Err(ConstraintViolation::Ripple { .. })
        ));
    }
}
