//! Evolutionary search over tubular motor designs.
//!
//! # Overview
//!
//! Each candidate runs through one pipeline:
//!
//! - **Evaluator** (`evaluator`): fresh simulator, phase alignment, sweep
//! - **Fitness** (`fitness`): sweep reduced to metrics and an objective tuple
//! - **Constraints** (`constraints`): voltage, inductance and power ceilings
//!
//! and the search around it consists of:
//!
//! - **Genome Operations** (`genome`, `operators`): gene bounds, blend
//!   crossover, bounded mutation, tournament selection
//! - **Search Algorithms** (`search`, `random_search`): generational GA and
//!   adaptive random search
//! - **Run Log** (`archive`): crash-safe incremental log
//! - **Pareto** (`pareto`): non-dominated front and weighted best
//!
//! # Example
//!
//! ```rust,no_run
//! use tubular_optimizer::compute::{AnalyticMotor, SimulatorError};
//! use tubular_optimizer::compute::evolution::EvolutionEngine;
//! use tubular_optimizer::schema::EvolutionConfig;
//!
//! let config = EvolutionConfig::default();
//! let factory = || Ok::<_, SimulatorError>(AnalyticMotor::default());
//!
//! let mut engine = EvolutionEngine::new(config, factory).unwrap();
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!("Generation {}: best = {:?}", progress.generation, progress.best_score);
//!     })
//!     .unwrap();
//!
//! println!("Pareto front size: {}", result.pareto.len());
//! ```

mod archive;
mod constraints;
mod evaluator;
mod fitness;
mod genome;
mod operators;
mod pareto;
mod random_search;
mod search;

pub use archive::{RunLogError, RunLogWriter, load_run_log, write_json};
pub use constraints::{ConstraintGate, ConstraintViolation};
pub use evaluator::{CandidateEvaluator, Evaluation, EvaluationError};
pub use fitness::{
    EPSILON, Extraction, ExtractionOutcome, Fitness, FitnessExtractor, MotorMetrics,
    SENTINEL_MAGNITUDE,
};
pub use genome::{GeneSpace, GenomeRng, genome_distance};
pub use operators::{
    BestSelection, BlendCrossover, CrossoverOperator, GaussianMutation, MutationOperator,
    Offspring, Operators, PolynomialBoundedMutation, SelectionOperator, TournamentSelection,
};
pub use pareto::{Analysis, ParetoSelector, dominates, pareto_front_indices, weighted_score};
pub use search::{EvolutionEngine, Individual, RunError};
