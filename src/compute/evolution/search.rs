//! Search loop driving evaluation, logging and selection.

use std::time::Instant;

use log::info;

use crate::compute::SimulatorFactory;
use crate::schema::{
    Candidate, EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionProgress,
    EvolutionResult, EvolutionStats, GeneticAlgorithmConfig, IndividualRecord, IndividualStatus,
    SearchAlgorithm, StopReason,
};

use super::archive::{RunLogError, RunLogWriter};
use super::evaluator::CandidateEvaluator;
use super::fitness::Fitness;
use super::genome::{GeneSpace, GenomeRng, genome_distance};
use super::operators::{Offspring, Operators};
use super::pareto::{ParetoSelector, weighted_score};

/// Top-level failure of a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] EvolutionConfigError),
    #[error(transparent)]
    RunLog(#[from] RunLogError),
}

/// An individual in the population.
#[derive(Debug, Clone)]
pub struct Individual {
    /// Unique identifier.
    pub id: u64,
    /// Clamped genes in `Candidate::to_genes` layout.
    pub genes: Vec<f64>,
    pub candidate: Candidate,
    /// Set once evaluated.
    pub fitness: Option<Fitness>,
    pub status: IndividualStatus,
    pub error: Option<String>,
    pub violation: Option<String>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Individual {
    /// Convert to a run log record.
    pub fn to_record(&self, config: &EvolutionConfig) -> IndividualRecord {
        let mut record = IndividualRecord::started(self.candidate.clone(), &config.wire_catalog);
        record.status = self.status;
        record.fitness = self
            .fitness
            .as_ref()
            .map(|f| f.to_named_map(&config.fitness.objectives));
        record.error = self.error.clone();
        record.violation = self.violation.clone();
        record
    }
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<F: SimulatorFactory> {
    pub(super) config: EvolutionConfig,
    pub(super) rng: GenomeRng,
    pub(super) space: GeneSpace,
    pub(super) evaluator: CandidateEvaluator<F>,
    pub(super) selector: ParetoSelector,
    pub(super) population: Vec<Individual>,
    pub(super) history: EvolutionHistory,
    pub(super) generation: usize,
    pub(super) evaluations: u64,
    pub(super) failures: u64,
    pub(super) best_score: Option<f64>,
    pub(super) generation_best: Option<f64>,
    next_id: u64,
}

impl<F: SimulatorFactory> EvolutionEngine<F> {
    /// Create a new evolution engine. The configuration is validated here.
    pub fn new(config: EvolutionConfig, factory: F) -> Result<Self, EvolutionConfigError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        info!("evolution seed {}", seed);

        Ok(Self {
            rng: GenomeRng::new(seed),
            space: GeneSpace::new(&config.bounds, config.wire_catalog.len()),
            evaluator: CandidateEvaluator::new(factory, &config),
            selector: ParetoSelector::new(&config.fitness),
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            evaluations: 0,
            failures: 0,
            best_score: None,
            generation_best: None,
            next_id: 0,
            config,
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Initialize the population with unevaluated random individuals.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.generation = 0;

        for _ in 0..self.config.population.size {
            let genes = self.space.random_genes(&mut self.rng);
            let individual = self.unevaluated(genes, Vec::new());
            self.population.push(individual);
        }
    }

    fn unevaluated(&mut self, genes: Vec<f64>, parents: Vec<u64>) -> Individual {
        let candidate = self.space.to_candidate(&genes);
        let id = self.next_id;
        self.next_id += 1;
        Individual {
            id,
            genes: candidate.to_genes(),
            candidate,
            fitness: None,
            status: IndividualStatus::Started,
            error: None,
            violation: None,
            generation: self.generation,
            parents,
        }
    }

    /// Evaluate one individual, writing the log before and after.
    pub(super) fn evaluate_logged(
        &mut self,
        log: &mut RunLogWriter,
        genes: Vec<f64>,
        parents: Vec<u64>,
    ) -> Result<Individual, RunLogError> {
        let mut individual = self.unevaluated(genes, parents);
        let index = log.record_started(&individual.candidate)?;

        let evaluation = self.evaluator.evaluate(&individual.candidate);
        log.record_outcome(index, &evaluation)?;

        self.evaluations += 1;
        if evaluation.fitness.is_sentinel() {
            self.failures += 1;
        }

        individual.status = evaluation.status;
        individual.fitness = Some(evaluation.fitness);
        individual.error = evaluation.error;
        individual.violation = evaluation.violation;
        Ok(individual)
    }

    /// Weighted score of a valid individual.
    pub(super) fn score(&self, individual: &Individual) -> Option<f64> {
        let record = individual.to_record(&self.config);
        self.selector
            .valid_values(&record)
            .map(|v| weighted_score(&v, self.selector.weights()))
    }

    /// Vary, evaluate and select one generation.
    fn step_genetic_algorithm(
        &mut self,
        operators: &Operators,
        log: &mut RunLogWriter,
    ) -> Result<(), RunLogError> {
        log.begin_generation(self.generation);

        let parent_genes: Vec<Vec<f64>> =
            self.population.iter().map(|i| i.genes.clone()).collect();
        let parent_ids: Vec<u64> = self.population.iter().map(|i| i.id).collect();
        let offspring = operators.vary_and(&parent_genes, &self.space, &mut self.rng);

        let mut evaluated = Vec::with_capacity(offspring.len());
        for Offspring { genes, parents } in offspring {
            let ids = parents.iter().map(|&p| parent_ids[p]).collect();
            evaluated.push(self.evaluate_logged(log, genes, ids)?);
        }

        self.record_generation(&evaluated);

        let fitness: Vec<Fitness> = evaluated
            .iter()
            .map(|i| {
                i.fitness
                    .clone()
                    .unwrap_or_else(|| Fitness::sentinel(&self.config.fitness.objectives))
            })
            .collect();
        let weights = self.selector.weights().to_vec();
        let chosen = operators.selection.select(
            &fitness,
            &weights,
            self.config.population.size,
            &mut self.rng,
        );
        self.population = chosen.into_iter().map(|i| evaluated[i].clone()).collect();

        self.generation += 1;
        Ok(())
    }

    /// Update history and best score from a freshly evaluated batch.
    pub(super) fn record_generation(&mut self, evaluated: &[Individual]) {
        let scores: Vec<f64> = evaluated.iter().filter_map(|i| self.score(i)).collect();
        let failures = evaluated
            .iter()
            .filter(|i| i.fitness.as_ref().is_none_or(Fitness::is_sentinel))
            .count();

        let generation_best = scores.iter().copied().reduce(f64::max);
        let avg = if scores.is_empty() {
            f64::NAN
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        if let Some(best) = generation_best
            && self.best_score.is_none_or(|b| best > b)
        {
            self.best_score = Some(best);
        }
        self.generation_best = generation_best;

        let diversity = self.diversity(evaluated);
        self.history.best_score.push(generation_best.unwrap_or(f64::NAN));
        self.history.avg_score.push(avg);
        self.history.failures.push(failures);
        self.history.diversity.push(diversity);

        match generation_best {
            Some(best) => info!(
                "generation {}: best score {:.4}, {}/{} failed",
                self.generation,
                best,
                failures,
                evaluated.len()
            ),
            None => info!(
                "generation {}: no valid individual, {}/{} failed",
                self.generation,
                failures,
                evaluated.len()
            ),
        }
    }

    /// Compute population diversity.
    fn diversity(&self, individuals: &[Individual]) -> f64 {
        if individuals.len() < 2 {
            return 0.0;
        }

        let mut total_distance = 0.0;
        let mut count = 0;

        for i in 0..individuals.len() {
            for j in (i + 1)..individuals.len() {
                total_distance +=
                    genome_distance(&individuals[i].genes, &individuals[j].genes, &self.space);
                count += 1;
            }
        }

        total_distance / count as f64
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.planned_generations(),
            evaluations_completed: self.evaluations,
            failed_evaluations: self.failures,
            best_score: self.best_score,
            generation_best: self.generation_best,
        }
    }

    fn planned_generations(&self) -> usize {
        match &self.config.algorithm {
            SearchAlgorithm::GeneticAlgorithm(_) => self.config.population.generations,
            SearchAlgorithm::RandomSearch(rs) => rs.max_iterations,
        }
    }

    /// Run the configured search with a progress callback after every generation.
    pub fn run_with_callback<C>(&mut self, callback: C) -> Result<EvolutionResult, RunError>
    where
        C: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();
        let mut log = RunLogWriter::create(
            &self.config.output.run_log,
            self.config.wire_catalog.clone(),
            self.config.fitness.objectives.clone(),
        )?;

        let (stop_reason, records) = match self.config.algorithm.clone() {
            SearchAlgorithm::GeneticAlgorithm(ga) => {
                let stop = self.run_genetic_algorithm(&ga, &mut log, &callback)?;
                let records: Vec<IndividualRecord> = self
                    .population
                    .iter()
                    .map(|i| i.to_record(&self.config))
                    .collect();
                (stop, records)
            }
            SearchAlgorithm::RandomSearch(rs) => {
                let stop = self.run_random_search(&rs, &mut log, &callback)?;
                let records: Vec<IndividualRecord> = log.log().individuals().cloned().collect();
                (stop, records)
            }
        };

        let analysis = self.selector.analyze_records(&records);
        analysis.write(
            self.config.output.pareto.as_deref(),
            self.config.output.best.as_deref(),
        )?;
        info!(
            "finished after {} evaluations ({} failed): {} on the Pareto front, best score {:?}",
            self.evaluations,
            self.failures,
            analysis.pareto.len(),
            analysis.best_score
        );

        Ok(EvolutionResult {
            pareto: analysis.pareto,
            best: analysis.best,
            best_score: analysis.best_score,
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                failed_evaluations: self.failures,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Run the configured search.
    pub fn run(&mut self) -> Result<EvolutionResult, RunError> {
        self.run_with_callback(|_| {})
    }

    fn run_genetic_algorithm<C>(
        &mut self,
        ga: &GeneticAlgorithmConfig,
        log: &mut RunLogWriter,
        callback: &C,
    ) -> Result<StopReason, RunLogError>
    where
        C: Fn(&EvolutionProgress),
    {
        let operators = Operators::from_config(ga);
        self.initialize();

        while self.generation < self.config.population.generations {
            self.step_genetic_algorithm(&operators, log)?;
            callback(&self.progress());
        }
        Ok(StopReason::MaxGenerations)
    }
}
