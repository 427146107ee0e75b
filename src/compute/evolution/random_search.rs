//! Adaptive random search around the best design found so far.
//!
//! Every iteration is logged as its own one-individual generation. The step
//! size halves after `stall_max` iterations without improvement.

use log::{debug, info};

use crate::compute::SimulatorFactory;
use crate::schema::{EvolutionProgress, RandomSearchConfig, StopReason};

use super::archive::{RunLogError, RunLogWriter};
use super::search::{EvolutionEngine, Individual};

impl<F: SimulatorFactory> EvolutionEngine<F> {
    pub(super) fn run_random_search<C>(
        &mut self,
        rs: &RandomSearchConfig,
        log: &mut RunLogWriter,
        callback: &C,
    ) -> Result<StopReason, RunLogError>
    where
        C: Fn(&EvolutionProgress),
    {
        let catalog_len = self.config.wire_catalog.len();
        let start = match &rs.start {
            Some(candidate) => self.config.bounds.conform(candidate, catalog_len).to_genes(),
            None => self.config.bounds.midpoint(catalog_len / 2).to_genes(),
        };

        self.generation = 0;
        let mut best = self.evaluate_iteration(log, start)?;
        let mut best_score = self.score(&best);
        callback(&self.progress());

        let mut step_size = rs.step_size;
        let mut stall = 0;

        while self.generation < rs.max_iterations {
            let genes = self.perturb(&best.genes, step_size);
            let trial = self.evaluate_iteration(log, genes)?;

            match self.score(&trial) {
                Some(score) if best_score.is_none_or(|b| score > b) => {
                    debug!("iteration {} improved to {:.4}", self.generation, score);
                    best = trial;
                    best_score = Some(score);
                    stall = 0;
                }
                _ => stall += 1,
            }
            callback(&self.progress());

            if stall >= rs.stall_max {
                step_size /= 2.0;
                stall = 0;
                info!(
                    "no improvement in {} iterations, step size now {:.4}",
                    rs.stall_max, step_size
                );
                if step_size < rs.min_step_size {
                    self.population = vec![best];
                    return Ok(StopReason::StepSizeExhausted);
                }
            }
        }

        self.population = vec![best];
        Ok(StopReason::MaxIterations)
    }

    fn evaluate_iteration(
        &mut self,
        log: &mut RunLogWriter,
        genes: Vec<f64>,
    ) -> Result<Individual, RunLogError> {
        log.begin_generation(self.generation);
        let individual = self.evaluate_logged(log, genes, Vec::new())?;
        self.record_generation(std::slice::from_ref(&individual));
        self.generation += 1;
        Ok(individual)
    }

    /// Offset every continuous gene by `step_size * U(-1, 1)`, reflect negatives,
    /// clamp, and draw a fresh wire index.
    fn perturb(&mut self, genes: &[f64], step_size: f64) -> Vec<f64> {
        let wire = self.space.wire_gene();
        let mut next: Vec<f64> = genes
            .iter()
            .enumerate()
            .map(|(i, &gene)| {
                if i == wire {
                    self.rng.index(self.space.catalog_len()) as f64
                } else {
                    (gene + step_size * self.rng.uniform((-1.0, 1.0))).abs()
                }
            })
            .collect();
        self.space.clamp(&mut next);
        next
    }
}
