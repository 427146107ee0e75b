//! Run log records persisted after every evaluation status change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Candidate, WeightedObjective};

/// Lifecycle of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndividualStatus {
    /// Evaluation began; a log ending here means the process died mid-run.
    Started,
    /// The sweep and extraction finished (possibly with the sentinel).
    Completed,
    /// The simulator or aligner failed.
    Crashed,
}

/// One individual as written to the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualRecord {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Catalog diameter of `candidate.wire_index` (mm).
    pub wire_diameter: f64,
    pub status: IndividualStatus,
    /// Objective values keyed by objective name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
}

impl IndividualRecord {
    /// Fresh `started` record.
    pub fn started(candidate: Candidate, wire_catalog: &[f64]) -> Self {
        let wire_diameter = wire_catalog
            .get(candidate.wire_index)
            .copied()
            .unwrap_or(0.0);
        Self {
            candidate,
            wire_diameter,
            status: IndividualStatus::Started,
            fitness: None,
            error: None,
            violation: None,
        }
    }

    /// Objective values in `objectives` order.
    ///
    /// Returns `None` when the record has no fitness or lacks any key.
    pub fn fitness_values(&self, objectives: &[WeightedObjective]) -> Option<Vec<f64>> {
        let fitness = self.fitness.as_ref()?;
        objectives
            .iter()
            .map(|o| fitness.get(o.objective.key()).copied())
            .collect()
    }
}

/// One generation of the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub individuals: Vec<IndividualRecord>,
}

/// Whole run log, serialized as a JSON array of generations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLog {
    pub generations: Vec<GenerationRecord>,
}

impl RunLog {
    /// Flatten all generations into one iterator of records.
    pub fn individuals(&self) -> impl Iterator<Item = &IndividualRecord> {
        self.generations.iter().flat_map(|g| g.individuals.iter())
    }

    /// Total individuals across generations.
    pub fn len(&self) -> usize {
        self.generations.iter().map(|g| g.individuals.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Objective, default_wire_catalog};

    fn candidate() -> Candidate {
        Candidate {
            slot_thickness: 1.0,
            slot_axial_length: 2.0,
            slot_axial_spacing: 3.0,
            back_iron_thickness: None,
            wire_index: 2,
        }
    }

    #[test]
    fn test_record_flattens_candidate() {
        let record = IndividualRecord::started(candidate(), &default_wire_catalog());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["slot_thickness"], 1.0);
        assert_eq!(value["wire_index"], 2);
        assert_eq!(value["wire_diameter"], 0.2);
        assert_eq!(value["status"], "started");
        assert!(value.get("fitness").is_none());
        assert!(value.get("back_iron_thickness").is_none());
    }

    #[test]
    fn test_run_log_is_array() {
        let log = RunLog {
            generations: vec![GenerationRecord {
                generation: 0,
                individuals: vec![IndividualRecord::started(candidate(), &[0.1, 0.2, 0.3])],
            }],
        };
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.starts_with('['));
        let parsed: RunLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_fitness_values_by_key() {
        let mut record = IndividualRecord::started(candidate(), &default_wire_catalog());
        record.fitness = Some(BTreeMap::from([
            ("average_force".to_string(), 4.0),
            ("ripple".to_string(), 0.5),
        ]));
        let objectives = [
            WeightedObjective::new(Objective::Ripple, -1.0),
            WeightedObjective::new(Objective::AverageForce, 2.0),
        ];
        assert_eq!(record.fitness_values(&objectives), Some(vec![0.5, 4.0]));

        let missing = [WeightedObjective::new(Objective::Inductance, -1.0)];
        assert_eq!(record.fitness_values(&missing), None);
    }
}
