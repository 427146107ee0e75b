//! Fitness extraction: reduce a sweep to motor metrics and an objective tuple.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compute::SweepResult;
use crate::schema::{Channel, ConstraintLimits, Objective, WeightedObjective};

use super::constraints::{ConstraintGate, ConstraintViolation};

/// Guard against division by zero.
pub const EPSILON: f64 = 1e-9;

/// Magnitude of every sentinel objective.
pub const SENTINEL_MAGNITUDE: f64 = 1e6;

/// Metrics reduced from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorMetrics {
    pub average_force: f64,
    pub average_power: f64,
    pub force_per_watt: f64,
    pub ripple: f64,
    pub resistance: f64,
    pub inductance: f64,
    pub time_constant: f64,
}

impl MotorMetrics {
    pub fn get(&self, objective: Objective) -> f64 {
        match objective {
            Objective::AverageForce => self.average_force,
            Objective::AveragePower => self.average_power,
            Objective::ForcePerWatt => self.force_per_watt,
            Objective::Ripple => self.ripple,
            Objective::Inductance => self.inductance,
            Objective::Resistance => self.resistance,
            Objective::TimeConstant => self.time_constant,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.average_force,
            self.average_power,
            self.force_per_watt,
            self.ripple,
            self.resistance,
            self.inductance,
            self.time_constant,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Objective tuple in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fitness {
    values: Vec<f64>,
    sentinel: bool,
}

impl Fitness {
    /// Worst possible fitness: -1e6 for maximized, +1e6 for minimized objectives.
    pub fn sentinel(objectives: &[WeightedObjective]) -> Self {
        let values = objectives
            .iter()
            .map(|o| {
                if o.maximizes() {
                    -SENTINEL_MAGNITUDE
                } else {
                    SENTINEL_MAGNITUDE
                }
            })
            .collect();
        Self {
            values,
            sentinel: true,
        }
    }

    pub fn from_metrics(metrics: &MotorMetrics, objectives: &[WeightedObjective]) -> Self {
        Self {
            values: objectives.iter().map(|o| metrics.get(o.objective)).collect(),
            sentinel: false,
        }
    }

    /// Fitness from raw values, as read back from a run log.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            values,
            sentinel: false,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    /// Whether raw values, ordered like `objectives`, are the sentinel tuple.
    pub fn is_sentinel_values(values: &[f64], objectives: &[WeightedObjective]) -> bool {
        values.len() == objectives.len()
            && values.iter().zip(objectives).all(|(&v, o)| {
                let worst = if o.maximizes() {
                    -SENTINEL_MAGNITUDE
                } else {
                    SENTINEL_MAGNITUDE
                };
                v == worst
            })
    }

    /// Compare lexicographically on weight-adjusted values. Greater is better.
    pub fn weighted_cmp(&self, other: &Fitness, weights: &[f64]) -> Ordering {
        for ((a, b), w) in self.values.iter().zip(&other.values).zip(weights) {
            match (a * w).partial_cmp(&(b * w)) {
                Some(Ordering::Equal) | None => continue,
                Some(ord) => return ord,
            }
        }
        Ordering::Equal
    }

    /// Values keyed by objective name.
    pub fn to_named_map(&self, objectives: &[WeightedObjective]) -> BTreeMap<String, f64> {
        objectives
            .iter()
            .zip(&self.values)
            .map(|(o, v)| (o.objective.key().to_string(), *v))
            .collect()
    }
}

/// How an extraction ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Metrics computed and every limit held.
    Scored,
    /// A constraint tripped.
    Rejected(ConstraintViolation),
    /// The sweep held no usable force samples.
    NoData,
    /// A derived metric was not finite.
    Degenerate,
}

/// Result of reducing one sweep.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub fitness: Fitness,
    pub outcome: ExtractionOutcome,
    /// Reduced metrics, when the sweep got that far.
    pub metrics: Option<MotorMetrics>,
}

impl Extraction {
    fn failed(objectives: &[WeightedObjective], outcome: ExtractionOutcome) -> Self {
        Self {
            fitness: Fitness::sentinel(objectives),
            outcome,
            metrics: None,
        }
    }
}

/// Reduces sweeps to fitness under a constraint gate.
#[derive(Debug, Clone)]
pub struct FitnessExtractor {
    objectives: Vec<WeightedObjective>,
    gate: ConstraintGate,
}

impl FitnessExtractor {
    pub fn new(objectives: Vec<WeightedObjective>, limits: ConstraintLimits) -> Self {
        Self {
            objectives,
            gate: ConstraintGate::new(limits),
        }
    }

    pub fn objectives(&self) -> &[WeightedObjective] {
        &self.objectives
    }

    pub fn extract(&self, sweep: &SweepResult) -> Extraction {
        if sweep.is_empty() {
            return Extraction::failed(&self.objectives, ExtractionOutcome::NoData);
        }

        let mut forces = Vec::with_capacity(sweep.len());
        let mut powers = Vec::with_capacity(sweep.len());
        let mut resistance_sum = 0.0;
        let mut inductance_sum = 0.0;
        let mut peak_samples = 0usize;

        for (k, step) in sweep.steps.iter().enumerate() {
            if let Err(violation) = self.gate.check_step(k, step) {
                return Extraction::failed(&self.objectives, ExtractionOutcome::Rejected(violation));
            }

            if let Some(force) = step.first(Channel::ForceLorentz) {
                forces.push(force);
            }
            if let Some(power) = step.values(Channel::PhasePower) {
                powers.push(power.iter().sum::<f64>());
            }

            let (Some(current), Some(voltage), Some(inductance)) = (
                step.values(Channel::PhaseCurrent),
                step.values(Channel::PhaseVoltage),
                step.values(Channel::PhaseInductance),
            ) else {
                continue;
            };
            let Some((peak, i)) = current
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            else {
                continue;
            };
            if i.abs() > EPSILON
                && let (Some(v), Some(l)) = (voltage.get(peak), inductance.get(peak))
            {
                resistance_sum += (v / i).abs();
                inductance_sum += l;
                peak_samples += 1;
            }
        }

        if forces.is_empty() {
            return Extraction::failed(&self.objectives, ExtractionOutcome::NoData);
        }

        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };
        let average_force = mean(&forces);
        let average_power = mean(&powers);
        let max_force = forces.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_force = forces.iter().copied().fold(f64::INFINITY, f64::min);

        let (resistance, inductance) = if peak_samples > 0 {
            (
                resistance_sum / peak_samples as f64,
                inductance_sum / peak_samples as f64,
            )
        } else {
            (EPSILON, 0.0)
        };
        let time_constant = if resistance > EPSILON {
            inductance / resistance
        } else {
            0.0
        };

        let metrics = MotorMetrics {
            average_force,
            average_power,
            force_per_watt: average_force / (average_power + EPSILON),
            ripple: max_force - min_force,
            resistance,
            inductance,
            time_constant,
        };

        if !metrics.is_finite() {
            return Extraction::failed(&self.objectives, ExtractionOutcome::Degenerate);
        }
        if let Err(violation) = self.gate.check_metrics(&metrics) {
            return Extraction {
                metrics: Some(metrics),
                ..Extraction::failed(&self.objectives, ExtractionOutcome::Rejected(violation))
            };
        }

        Extraction {
            fitness: Fitness::from_metrics(&metrics, &self.objectives),
            outcome: ExtractionOutcome::Scored,
            metrics: Some(metrics),
        }
    }
}
