//! Evaluation pipeline for one candidate: simulator, aligner, sweep, extractor.

use log::warn;

use crate::compute::{
    AlignmentError, PhaseAligner, Simulator, SimulatorError, SimulatorFactory, SweepEngine,
};
use crate::schema::{Candidate, EvolutionConfig, IndividualStatus, MotorParameters};

use super::fitness::{Extraction, ExtractionOutcome, Fitness, FitnessExtractor, MotorMetrics};

/// Failure that crashes an evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Simulator(#[from] SimulatorError),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub fitness: Fitness,
    pub status: IndividualStatus,
    pub metrics: Option<MotorMetrics>,
    pub error: Option<String>,
    pub violation: Option<String>,
}

/// Runs candidates through a fresh simulator each.
pub struct CandidateEvaluator<F> {
    factory: F,
    aligner: PhaseAligner,
    sweep: SweepEngine,
    extractor: FitnessExtractor,
    wire_catalog: Vec<f64>,
}

impl<F: SimulatorFactory> CandidateEvaluator<F> {
    pub fn new(factory: F, config: &EvolutionConfig) -> Self {
        Self {
            factory,
            aligner: PhaseAligner::from_config(&config.simulation),
            sweep: SweepEngine::from_config(&config.simulation),
            extractor: FitnessExtractor::new(
                config.fitness.objectives.clone(),
                config.limits.clone(),
            ),
            wire_catalog: config.wire_catalog.clone(),
        }
    }

    /// Evaluate a candidate. Never fails: every failure maps to the sentinel.
    pub fn evaluate(&self, candidate: &Candidate) -> Evaluation {
        let params = candidate.parameters(&self.wire_catalog);
        let objectives = self.extractor.objectives();

        let extraction = match self.run(&params) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("evaluation crashed for {}: {}", params, e);
                return Evaluation {
                    fitness: Fitness::sentinel(objectives),
                    status: IndividualStatus::Crashed,
                    metrics: None,
                    error: Some(e.to_string()),
                    violation: None,
                };
            }
        };

        let Extraction {
            fitness,
            outcome,
            metrics,
        } = extraction;
        let (error, violation) = match outcome {
            ExtractionOutcome::Scored => (None, None),
            ExtractionOutcome::Rejected(v) => {
                warn!("constraint violated for {}: {}", params, v);
                (None, Some(v.to_string()))
            }
            ExtractionOutcome::NoData => {
                warn!("no force samples for {}", params);
                (Some("sweep produced no force samples".to_string()), None)
            }
            ExtractionOutcome::Degenerate => {
                warn!("non-finite metrics for {}", params);
                (Some("non-finite metrics".to_string()), None)
            }
        };

        Evaluation {
            fitness,
            status: IndividualStatus::Completed,
            metrics,
            error,
            violation,
        }
    }

    fn run(&self, params: &MotorParameters) -> Result<Extraction, EvaluationError> {
        let mut sim = self.factory.create()?;
        sim.configure(params)?;
        let offset = self.aligner.align(&mut sim)?;
        log::debug!("aligned {} at {:.4} rad", params, offset);
        let sweep = self.sweep.try_sweep(&mut sim, offset)?;
        Ok(self.extractor.extract(&sweep))
    }
}
