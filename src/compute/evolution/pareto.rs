//! Pareto front and weighted-scalar selection over scored records.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{FitnessConfig, IndividualRecord, IndividualStatus, RunLog, WeightedObjective};

use super::archive::{RunLogError, write_json};
use super::fitness::Fitness;

/// Weighted sum of objective values.
#[inline]
pub fn weighted_score(values: &[f64], weights: &[f64]) -> f64 {
    values.iter().zip(weights).map(|(v, w)| v * w).sum()
}

/// Whether `a` dominates `b` on weight-adjusted values.
pub fn dominates(a: &[f64], b: &[f64], weights: &[f64]) -> bool {
    let mut strictly_better = false;
    for ((x, y), w) in a.iter().zip(b).zip(weights) {
        let (x, y) = (x * w, y * w);
        if x < y {
            return false;
        }
        if x > y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Indices of the non-dominated points, in input order.
pub fn pareto_front_indices(points: &[Vec<f64>], weights: &[f64]) -> Vec<usize> {
    (0..points.len())
        .into_par_iter()
        .filter(|&i| {
            !points
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && dominates(other, &points[i], weights))
        })
        .collect()
}

/// Result of analyzing a set of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Records considered.
    pub total: usize,
    /// Records that passed the validity filter.
    pub valid: usize,
    pub pareto: Vec<IndividualRecord>,
    pub best: Option<IndividualRecord>,
    pub best_score: Option<f64>,
}

impl Analysis {
    /// Write the front and the best record, skipping unset paths.
    pub fn write(
        &self,
        pareto_path: Option<&Path>,
        best_path: Option<&Path>,
    ) -> Result<(), RunLogError> {
        if let Some(path) = pareto_path {
            write_json(path, &self.pareto)?;
        }
        if let (Some(path), Some(best)) = (best_path, &self.best) {
            write_json(path, best)?;
        }
        Ok(())
    }
}

/// Filters valid records and selects the front and the best scalar.
#[derive(Debug, Clone)]
pub struct ParetoSelector {
    objectives: Vec<WeightedObjective>,
    weights: Vec<f64>,
    sanity_threshold: f64,
}

impl ParetoSelector {
    pub fn new(config: &FitnessConfig) -> Self {
        Self {
            objectives: config.objectives.clone(),
            weights: config.weights(),
            sanity_threshold: config.sanity_threshold,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Objective values of a usable record.
    ///
    /// Rejects anything not `completed`, carrying an error or violation,
    /// equal to the sentinel, non-finite, or at or above the sanity threshold.
    pub fn valid_values(&self, record: &IndividualRecord) -> Option<Vec<f64>> {
        if record.status != IndividualStatus::Completed
            || record.error.is_some()
            || record.violation.is_some()
        {
            return None;
        }
        let values = record.fitness_values(&self.objectives)?;
        if Fitness::is_sentinel_values(&values, &self.objectives) {
            return None;
        }
        values
            .iter()
            .all(|v| v.is_finite() && v.abs() < self.sanity_threshold)
            .then_some(values)
    }

    fn valid<'a>(
        &self,
        records: impl IntoIterator<Item = &'a IndividualRecord>,
    ) -> Vec<(&'a IndividualRecord, Vec<f64>)> {
        records
            .into_iter()
            .filter_map(|r| self.valid_values(r).map(|v| (r, v)))
            .collect()
    }

    /// Non-dominated valid records, in input order.
    pub fn pareto_front<'a>(
        &self,
        records: impl IntoIterator<Item = &'a IndividualRecord>,
    ) -> Vec<IndividualRecord> {
        let valid = self.valid(records);
        let points: Vec<Vec<f64>> = valid.iter().map(|(_, v)| v.clone()).collect();
        pareto_front_indices(&points, &self.weights)
            .into_iter()
            .map(|i| valid[i].0.clone())
            .collect()
    }

    /// Valid record with the highest weighted score. Ties keep the first.
    pub fn best<'a>(
        &self,
        records: impl IntoIterator<Item = &'a IndividualRecord>,
    ) -> Option<(IndividualRecord, f64)> {
        let mut best: Option<(&IndividualRecord, f64)> = None;
        for (record, values) in self.valid(records) {
            let score = weighted_score(&values, &self.weights);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((record, score));
            }
        }
        best.map(|(r, s)| (r.clone(), s))
    }

    pub fn analyze_records(&self, records: &[IndividualRecord]) -> Analysis {
        let (best, best_score) = match self.best(records) {
            Some((record, score)) => (Some(record), Some(score)),
            None => (None, None),
        };
        Analysis {
            total: records.len(),
            valid: self.valid(records).len(),
            pareto: self.pareto_front(records),
            best,
            best_score,
        }
    }

    /// Analyze every generation of a run log together.
    pub fn analyze(&self, log: &RunLog) -> Analysis {
        let records: Vec<IndividualRecord> = log.individuals().cloned().collect();
        self.analyze_records(&records)
    }
}
