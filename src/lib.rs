//! Tubular optimizer - Evolutionary design search for tubular linear motors.
//!
//! Candidate geometries are simulated, reduced to force, power and
//! inductance metrics under hard electrical limits, and searched with a
//! multi-objective genetic algorithm that logs every evaluation as it
//! happens.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, candidate and run log types
//! - `compute`: Simulator boundary, alignment, sweep, fitness and search
//!
//! # Example
//!
//! ```rust,no_run
//! use tubular_optimizer::{
//!     CandidateEvaluator,
//!     compute::{AnalyticMotor, SimulatorError},
//!     schema::{CandidateBounds, EvolutionConfig},
//! };
//!
//! let config = EvolutionConfig::default();
//! let evaluator = CandidateEvaluator::new(
//!     || Ok::<_, SimulatorError>(AnalyticMotor::default()),
//!     &config,
//! );
//!
//! let candidate = CandidateBounds::default().midpoint(6);
//! let evaluation = evaluator.evaluate(&candidate);
//! println!("{:?}: {:?}", evaluation.status, evaluation.fitness.values());
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{CandidateEvaluator, EvolutionEngine, ParetoSelector, RunError};
pub use compute::{AnalyticMotor, Simulator, SimulatorError};
pub use schema::{Candidate, EvolutionConfig, SimulationConfig};
