//! Evolution configuration types for motor design search.
//!
//! An [`EvolutionConfig`] is the immutable description of one run: parameter
//! bounds, wire catalog, objective weights, constraint ceilings, search
//! algorithm and output paths. It is passed to the engine constructor and
//! never mutated afterwards.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{Candidate, CandidateBounds, IndividualRecord, SimulationConfig, default_wire_catalog};

/// Top-level configuration for one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Alignment and sweep settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Bounds of every continuous candidate field.
    #[serde(default)]
    pub bounds: CandidateBounds,
    /// Legal wire diameters (mm), ascending.
    #[serde(default = "default_wire_catalog")]
    pub wire_catalog: Vec<f64>,
    /// Objectives and their weights.
    #[serde(default)]
    pub fitness: FitnessConfig,
    /// Hard ceilings checked during extraction.
    #[serde(default)]
    pub limits: ConstraintLimits,
    /// Search algorithm to use.
    #[serde(default)]
    pub algorithm: SearchAlgorithm,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Where results are written.
    #[serde(default)]
    pub output: OutputConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            bounds: CandidateBounds::default(),
            wire_catalog: default_wire_catalog(),
            fitness: FitnessConfig::default(),
            limits: ConstraintLimits::default(),
            algorithm: SearchAlgorithm::default(),
            population: PopulationConfig::default(),
            output: OutputConfig::default(),
            random_seed: None,
        }
    }
}

/// Scalar objective derived from a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Mean axial force (N).
    AverageForce,
    /// Mean summed phase power (W).
    AveragePower,
    /// Average force per watt (N/W).
    ForcePerWatt,
    /// Peak-to-peak force ripple (N).
    Ripple,
    /// Inductance at the peak-current phase (H).
    Inductance,
    /// Resistance at the peak-current phase (Ohm).
    Resistance,
    /// L/R time constant (s).
    TimeConstant,
}

impl Objective {
    /// Key used in run log fitness maps.
    pub fn key(&self) -> &'static str {
        match self {
            Objective::AverageForce => "average_force",
            Objective::AveragePower => "average_power",
            Objective::ForcePerWatt => "force_per_watt",
            Objective::Ripple => "ripple",
            Objective::Inductance => "inductance",
            Objective::Resistance => "resistance",
            Objective::TimeConstant => "time_constant",
        }
    }
}

/// An objective with its signed weight. Positive maximizes, negative minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedObjective {
    pub objective: Objective,
    pub weight: f64,
}

impl WeightedObjective {
    pub fn new(objective: Objective, weight: f64) -> Self {
        Self { objective, weight }
    }

    /// Whether larger values are better.
    #[inline]
    pub fn maximizes(&self) -> bool {
        self.weight >= 0.0
    }
}

/// Fitness configuration with weighted objectives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Objectives in fitness-tuple order.
    #[serde(default = "default_objectives")]
    pub objectives: Vec<WeightedObjective>,
    /// Objective magnitudes at or above this are treated as numerical garbage.
    #[serde(default = "default_sanity_threshold")]
    pub sanity_threshold: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            objectives: default_objectives(),
            sanity_threshold: default_sanity_threshold(),
        }
    }
}

impl FitnessConfig {
    /// Weights in objective order.
    pub fn weights(&self) -> Vec<f64> {
        self.objectives.iter().map(|o| o.weight).collect()
    }
}

fn default_objectives() -> Vec<WeightedObjective> {
    vec![
        WeightedObjective::new(Objective::AverageForce, 6.0),
        WeightedObjective::new(Objective::ForcePerWatt, 3.0),
        WeightedObjective::new(Objective::Ripple, -4.0),
        WeightedObjective::new(Objective::Inductance, -2.0),
        WeightedObjective::new(Objective::Resistance, -1.0),
        WeightedObjective::new(Objective::TimeConstant, -4.0),
    ]
}
fn default_sanity_threshold() -> f64 {
    1e5
}

/// Hard ceilings applied by the constraint gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintLimits {
    /// Maximum absolute phase voltage (V), checked every step.
    #[serde(default = "default_max_voltage")]
    pub max_voltage: f64,
    /// Maximum summed phase power (W), checked every step.
    #[serde(default = "default_max_power")]
    pub max_power: f64,
    /// Maximum phase inductance (H), checked every step.
    #[serde(default = "default_max_inductance")]
    pub max_inductance: f64,
    /// Maximum averaged resistance (Ohm), checked after reduction.
    #[serde(default)]
    pub max_resistance: Option<f64>,
    /// Maximum peak-to-peak ripple (N), checked after reduction.
    #[serde(default)]
    pub max_ripple: Option<f64>,
}

impl Default for ConstraintLimits {
    fn default() -> Self {
        Self {
            max_voltage: default_max_voltage(),
            max_power: default_max_power(),
            max_inductance: default_max_inductance(),
            max_resistance: None,
            max_ripple: None,
        }
    }
}

fn default_max_voltage() -> f64 {
    35.0
}
fn default_max_power() -> f64 {
    100.0
}
fn default_max_inductance() -> f64 {
    0.01
}

/// Search algorithm selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchAlgorithm {
    /// Generational GA: blend crossover, bounded mutation, tournament selection.
    GeneticAlgorithm(GeneticAlgorithmConfig),
    /// Adaptive random search with step-size halving on stagnation.
    RandomSearch(RandomSearchConfig),
}

impl Default for SearchAlgorithm {
    fn default() -> Self {
        Self::GeneticAlgorithm(GeneticAlgorithmConfig::default())
    }
}

/// Genetic Algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Probability a consecutive pair is crossed (`cxpb`).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability an offspring is mutated (`mutpb`).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    #[serde(default)]
    pub crossover: CrossoverMethod,
    #[serde(default)]
    pub mutation: MutationMethod,
    #[serde(default)]
    pub selection: SelectionMethod,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            crossover: CrossoverMethod::default(),
            mutation: MutationMethod::default(),
            selection: SelectionMethod::default(),
        }
    }
}

fn default_crossover_rate() -> f64 {
    0.7
}
fn default_mutation_rate() -> f64 {
    0.5
}

/// Crossover operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum CrossoverMethod {
    /// Blend crossover: each gene drawn from the interval extended by `alpha`.
    Blend {
        #[serde(default = "default_blend_alpha")]
        alpha: f64,
    },
}

impl Default for CrossoverMethod {
    fn default() -> Self {
        Self::Blend {
            alpha: default_blend_alpha(),
        }
    }
}

fn default_blend_alpha() -> f64 {
    0.5
}

/// Mutation operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum MutationMethod {
    /// Bounded polynomial mutation with distribution index `eta`.
    PolynomialBounded {
        #[serde(default = "default_eta")]
        eta: f64,
        #[serde(default = "default_gene_probability")]
        indpb: f64,
    },
    /// Additive Gaussian noise.
    Gaussian {
        #[serde(default)]
        mu: f64,
        #[serde(default = "default_sigma")]
        sigma: f64,
        #[serde(default = "default_gene_probability")]
        indpb: f64,
    },
}

impl Default for MutationMethod {
    fn default() -> Self {
        Self::PolynomialBounded {
            eta: default_eta(),
            indpb: default_gene_probability(),
        }
    }
}

fn default_eta() -> f64 {
    20.0
}
fn default_sigma() -> f64 {
    1.0
}
fn default_gene_probability() -> f64 {
    0.2
}

/// Selection method for the next population.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with replacement.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Keep the best individuals under the weighted objective order.
    Best,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Adaptive random search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomSearchConfig {
    /// Maximum number of evaluations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Initial perturbation half-width (mm).
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Search stops once the step size falls below this.
    #[serde(default = "default_min_step_size")]
    pub min_step_size: f64,
    /// Non-improving iterations before the step size halves.
    #[serde(default = "default_stall_max")]
    pub stall_max: usize,
    /// Starting design. Defaults to the center of the bounds.
    #[serde(default)]
    pub start: Option<Candidate>,
}

impl Default for RandomSearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            step_size: default_step_size(),
            min_step_size: default_min_step_size(),
            stall_max: default_stall_max(),
            start: None,
        }
    }
}

fn default_max_iterations() -> usize {
    1000
}
fn default_step_size() -> f64 {
    20.0
}
fn default_min_step_size() -> f64 {
    0.315
}
fn default_stall_max() -> usize {
    50
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations.
    #[serde(default = "default_generations")]
    pub generations: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            generations: default_generations(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_generations() -> usize {
    25
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Incrementally written run log.
    #[serde(default = "default_run_log_path")]
    pub run_log: PathBuf,
    /// Pareto front records, written at run end.
    #[serde(default = "default_pareto_path")]
    pub pareto: Option<PathBuf>,
    /// Best scalarized record, written at run end.
    #[serde(default = "default_best_path")]
    pub best: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_log: default_run_log_path(),
            pareto: default_pareto_path(),
            best: default_best_path(),
        }
    }
}

fn default_run_log_path() -> PathBuf {
    PathBuf::from("run_log.json")
}
fn default_pareto_path() -> Option<PathBuf> {
    Some(PathBuf::from("pareto_front.json"))
}
fn default_best_path() -> Option<PathBuf> {
    Some(PathBuf::from("best_individual.json"))
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Progress update emitted after every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generations (or random-search iterations) completed.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Evaluations completed so far.
    pub evaluations_completed: u64,
    /// Evaluations that ended with the sentinel fitness.
    pub failed_evaluations: u64,
    /// Best weighted score among valid individuals so far.
    pub best_score: Option<f64>,
    /// Best weighted score of the latest generation.
    pub generation_best: Option<f64>,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best valid score per generation (NaN when none was valid).
    pub best_score: Vec<f64>,
    /// Mean valid score per generation (NaN when none was valid).
    pub avg_score: Vec<f64>,
    /// Failed evaluations per generation.
    pub failures: Vec<usize>,
    /// Mean normalized gene distance per generation.
    pub diversity: Vec<f64>,
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Non-dominated valid records of the final population.
    pub pareto: Vec<IndividualRecord>,
    /// Best weighted-scalar valid record.
    pub best: Option<IndividualRecord>,
    /// Score of `best`.
    pub best_score: Option<f64>,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Per-generation history.
    pub history: EvolutionHistory,
}

/// Statistics from a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations (or iterations) completed.
    pub generations: usize,
    /// Total evaluations performed.
    pub total_evaluations: u64,
    /// Evaluations assigned the sentinel fitness.
    pub failed_evaluations: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason a run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Completed the configured number of generations.
    MaxGenerations,
    /// Random search used its iteration budget.
    MaxIterations,
    /// Random search step size fell below its minimum.
    StepSizeExhausted,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 1")]
    PopulationTooSmall,
    #[error("No objectives specified")]
    NoObjectives,
    #[error("Invalid objective weight: {0}")]
    InvalidWeight(String),
    #[error("Wire catalog must not be empty")]
    EmptyWireCatalog,
    #[error("Invalid wire diameter: {0}")]
    InvalidWireDiameter(f64),
    #[error("Invalid parameter bounds: {0}")]
    InvalidBounds(String),
    #[error("Invalid probability {name}: {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Invalid operator setting: {0}")]
    InvalidOperator(String),
    #[error("Invalid constraint limit: {0}")]
    InvalidLimit(String),
    #[error("Simulation config validation failed: {0}")]
    SimulationConfigError(#[from] super::ConfigError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.simulation.validate()?;

        if self.population.size == 0 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }

        if self.fitness.objectives.is_empty() {
            return Err(EvolutionConfigError::NoObjectives);
        }
        for o in &self.fitness.objectives {
            if !o.weight.is_finite() {
                return Err(EvolutionConfigError::InvalidWeight(format!(
                    "{} weight {} must be finite",
                    o.objective.key(),
                    o.weight
                )));
            }
        }
        if !(self.fitness.sanity_threshold.is_finite() && self.fitness.sanity_threshold > 0.0) {
            return Err(EvolutionConfigError::InvalidLimit(format!(
                "sanity_threshold {}",
                self.fitness.sanity_threshold
            )));
        }

        if self.wire_catalog.is_empty() {
            return Err(EvolutionConfigError::EmptyWireCatalog);
        }
        if let Some(&d) = self
            .wire_catalog
            .iter()
            .find(|d| !(d.is_finite() && **d > 0.0))
        {
            return Err(EvolutionConfigError::InvalidWireDiameter(d));
        }

        let check_bounds = |bounds: (f64, f64), name: &str| {
            if !(bounds.0.is_finite() && bounds.1.is_finite()) || bounds.0 > bounds.1 {
                Err(EvolutionConfigError::InvalidBounds(format!(
                    "{} min ({}) > max ({})",
                    name, bounds.0, bounds.1
                )))
            } else if bounds.0 <= 0.0 {
                Err(EvolutionConfigError::InvalidBounds(format!(
                    "{} min ({}) must be positive",
                    name, bounds.0
                )))
            } else {
                Ok(())
            }
        };
        check_bounds(self.bounds.slot_thickness, "slot_thickness")?;
        check_bounds(self.bounds.slot_axial_length, "slot_axial_length")?;
        check_bounds(self.bounds.slot_axial_spacing, "slot_axial_spacing")?;
        if let Some(b) = self.bounds.back_iron_thickness {
            check_bounds(b, "back_iron_thickness")?;
        }

        let check_limit = |value: f64, name: &str| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidLimit(format!("{} {}", name, value)))
            }
        };
        check_limit(self.limits.max_voltage, "max_voltage")?;
        check_limit(self.limits.max_power, "max_power")?;
        check_limit(self.limits.max_inductance, "max_inductance")?;
        if let Some(v) = self.limits.max_resistance {
            check_limit(v, "max_resistance")?;
        }
        if let Some(v) = self.limits.max_ripple {
            check_limit(v, "max_ripple")?;
        }

        match &self.algorithm {
            SearchAlgorithm::GeneticAlgorithm(ga) => ga.validate()?,
            SearchAlgorithm::RandomSearch(rs) => rs.validate()?,
        }

        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), EvolutionConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EvolutionConfigError::InvalidProbability { name, value })
    }
}

impl GeneticAlgorithmConfig {
    fn validate(&self) -> Result<(), EvolutionConfigError> {
        check_probability("crossover_rate", self.crossover_rate)?;
        check_probability("mutation_rate", self.mutation_rate)?;

        let CrossoverMethod::Blend { alpha } = self.crossover;
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(EvolutionConfigError::InvalidOperator(format!(
                "blend alpha {}",
                alpha
            )));
        }

        match self.mutation {
            MutationMethod::PolynomialBounded { eta, indpb } => {
                check_probability("indpb", indpb)?;
                if !(eta.is_finite() && eta >= 0.0) {
                    return Err(EvolutionConfigError::InvalidOperator(format!("eta {}", eta)));
                }
            }
            MutationMethod::Gaussian { mu, sigma, indpb } => {
                check_probability("indpb", indpb)?;
                if !(mu.is_finite() && sigma.is_finite() && sigma >= 0.0) {
                    return Err(EvolutionConfigError::InvalidOperator(format!(
                        "gaussian mu {} sigma {}",
                        mu, sigma
                    )));
                }
            }
        }

        if let SelectionMethod::Tournament { size } = self.selection
            && size == 0
        {
            return Err(EvolutionConfigError::InvalidOperator(
                "tournament size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl RandomSearchConfig {
    fn validate(&self) -> Result<(), EvolutionConfigError> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(EvolutionConfigError::InvalidOperator(format!(
                "step_size {}",
                self.step_size
            )));
        }
        if !(self.min_step_size.is_finite() && self.min_step_size > 0.0) {
            return Err(EvolutionConfigError::InvalidOperator(format!(
                "min_step_size {}",
                self.min_step_size
            )));
        }
        if self.stall_max == 0 {
            return Err(EvolutionConfigError::InvalidOperator(
                "stall_max must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weights() {
        let config = FitnessConfig::default();
        assert_eq!(config.weights(), vec![6.0, 3.0, -4.0, -2.0, -1.0, -4.0]);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut config = EvolutionConfig::default();
        config.bounds.slot_axial_length = (5.0, 1.0);
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_probability_range() {
        let config = EvolutionConfig {
            algorithm: SearchAlgorithm::GeneticAlgorithm(GeneticAlgorithmConfig {
                crossover_rate: 1.5,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidProbability {
                name: "crossover_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let config = EvolutionConfig {
            wire_catalog: vec![],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::EmptyWireCatalog)
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "population": { "size": 4, "generations": 2 },
            "algorithm": { "type": "GeneticAlgorithm", "selection": { "method": "Best" } },
            "random_seed": 7
        }"#;
        let config: EvolutionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.population.size, 4);
        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.wire_catalog.len(), 14);
        match &config.algorithm {
            SearchAlgorithm::GeneticAlgorithm(ga) => {
                assert!(matches!(ga.selection, SelectionMethod::Best));
                assert_eq!(ga.crossover_rate, 0.7);
            }
            _ => panic!("expected genetic algorithm"),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialization() {
        let config = EvolutionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvolutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.fitness.objectives, config.fitness.objectives);
    }
}
