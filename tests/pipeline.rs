//! End-to-end runs against deterministic stub simulators.

use std::cell::Cell;
use std::path::Path;

use tempfile::tempdir;
use tubular_optimizer::compute::evolution::{EvolutionEngine, ParetoSelector, load_run_log};
use tubular_optimizer::compute::{
    AnalyticMotor, ChannelValues, PhaseCurrents, Simulator, SimulatorError,
};
use tubular_optimizer::schema::{
    Channel, EvolutionConfig, IndividualRecord, IndividualStatus, MotorParameters, Objective,
    PopulationConfig, WeightedObjective,
};

/// Reports the same outputs at every position.
struct ConstantMotor;

impl Simulator for ConstantMotor {
    fn configure(&mut self, _: &MotorParameters) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn set_currents(&mut self, _: PhaseCurrents) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn step(&mut self, _: f64) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn query(&mut self, channels: &[Channel]) -> Result<ChannelValues, SimulatorError> {
        Ok(channels
            .iter()
            .map(|&c| {
                let values = match c {
                    Channel::ForceLorentz => vec![5.0, 0.0],
                    Channel::PhasePower => vec![2.0, 0.0, 0.0],
                    Channel::PhaseVoltage => vec![1.0, 0.5, 0.5],
                    Channel::PhaseCurrent => vec![1.0, 0.5, 0.5],
                    Channel::PhaseInductance => vec![0.001, 0.001, 0.001],
                };
                (c, values)
            })
            .collect())
    }

    fn period(&self) -> Option<f64> {
        Some(10.0)
    }
}

/// Reports force 5 with power lumped into a single value.
struct LumpedPowerMotor {
    power: f64,
}

impl Simulator for LumpedPowerMotor {
    fn configure(&mut self, _: &MotorParameters) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn set_currents(&mut self, _: PhaseCurrents) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn step(&mut self, _: f64) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn query(&mut self, channels: &[Channel]) -> Result<ChannelValues, SimulatorError> {
        let mut values = ConstantMotor.query(channels)?;
        if let Some(power) = values.get_mut(&Channel::PhasePower) {
            *power = vec![self.power];
        }
        Ok(values)
    }

    fn period(&self) -> Option<f64> {
        Some(10.0)
    }
}

/// Fails every solve.
struct DivergingMotor;

impl Simulator for DivergingMotor {
    fn configure(&mut self, _: &MotorParameters) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn set_currents(&mut self, _: PhaseCurrents) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn step(&mut self, _: f64) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn query(&mut self, _: &[Channel]) -> Result<ChannelValues, SimulatorError> {
        Err(SimulatorError::Solve {
            displacement: 0.0,
            reason: "diverged".to_string(),
        })
    }

    fn period(&self) -> Option<f64> {
        Some(10.0)
    }
}

fn config(dir: &Path, size: usize, generations: usize) -> EvolutionConfig {
    let mut config = EvolutionConfig {
        population: PopulationConfig { size, generations },
        random_seed: Some(2024),
        ..Default::default()
    };
    config.simulation.alignment_samples = 6;
    config.simulation.rotational_samples = 8;
    config.output.run_log = dir.join("run_log.json");
    config.output.pareto = Some(dir.join("pareto_front.json"));
    config.output.best = Some(dir.join("best_individual.json"));
    config
}

fn records(dir: &Path) -> Vec<IndividualRecord> {
    load_run_log(dir.join("run_log.json"))
        .unwrap()
        .individuals()
        .cloned()
        .collect()
}

#[test]
fn test_constant_motor_single_individual() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("run_log.json");
    let saw_started = Cell::new(false);

    let factory = || {
        // The started record must be on disk before the simulator exists.
        let on_disk = load_run_log(&log_path).unwrap();
        let last = on_disk.individuals().last().unwrap();
        saw_started.set(last.status == IndividualStatus::Started);
        Ok::<_, SimulatorError>(ConstantMotor)
    };
    let mut engine = EvolutionEngine::new(config(dir.path(), 1, 1), factory).unwrap();
    let result = engine.run().unwrap();
    assert!(saw_started.get());

    let records = records(dir.path());
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, IndividualStatus::Completed);
    assert_eq!(record.error, None);
    assert_eq!(record.violation, None);

    let fitness = record.fitness.as_ref().unwrap();
    assert_eq!(fitness["average_force"], 5.0);
    assert_eq!(fitness["ripple"], 0.0);
    assert_eq!(fitness["resistance"], 1.0);
    assert_eq!(fitness["inductance"], 0.001);
    assert!((fitness["force_per_watt"] - 2.5).abs() < 1e-6);

    assert_eq!(result.pareto.len(), 1);
    let best = result.best.unwrap();
    assert_eq!(best.candidate.wire_index, record.candidate.wire_index);
    assert_eq!(best.fitness.unwrap()["average_force"], 5.0);
    assert_eq!(result.stats.failed_evaluations, 0);
}

#[test]
fn test_average_power_objective() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), 1, 1);
    config.fitness.objectives = vec![WeightedObjective::new(Objective::AveragePower, -1.0)];
    let mut engine =
        EvolutionEngine::new(config, || Ok::<_, SimulatorError>(ConstantMotor)).unwrap();
    engine.run().unwrap();

    let records = records(dir.path());
    assert_eq!(records[0].fitness.as_ref().unwrap()["average_power"], 2.0);
}

#[test]
fn test_lumped_power_is_averaged() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), 1, 1);
    config.fitness.objectives = vec![
        WeightedObjective::new(Objective::AveragePower, -1.0),
        WeightedObjective::new(Objective::ForcePerWatt, 1.0),
    ];
    let mut engine = EvolutionEngine::new(config, || {
        Ok::<_, SimulatorError>(LumpedPowerMotor { power: 2.0 })
    })
    .unwrap();
    engine.run().unwrap();

    let records = records(dir.path());
    assert_eq!(records[0].status, IndividualStatus::Completed);
    assert_eq!(records[0].violation, None);
    let fitness = records[0].fitness.as_ref().unwrap();
    assert_eq!(fitness["average_power"], 2.0);
    assert!((fitness["force_per_watt"] - 2.5).abs() < 1e-6);
}

#[test]
fn test_lumped_power_over_ceiling_rejected() {
    let dir = tempdir().unwrap();
    let mut engine = EvolutionEngine::new(config(dir.path(), 1, 1), || {
        Ok::<_, SimulatorError>(LumpedPowerMotor { power: 500.0 })
    })
    .unwrap();
    let result = engine.run().unwrap();

    let records = records(dir.path());
    assert_eq!(records[0].status, IndividualStatus::Completed);
    let violation = records[0].violation.as_deref().unwrap();
    assert!(violation.contains("power 500"));
    assert_eq!(records[0].fitness.as_ref().unwrap()["average_force"], -1e6);
    assert!(result.best.is_none());
}

#[test]
fn test_failing_motor_continues() {
    let dir = tempdir().unwrap();
    let mut engine =
        EvolutionEngine::new(config(dir.path(), 3, 2), || Ok::<_, SimulatorError>(DivergingMotor))
            .unwrap();
    let result = engine.run().unwrap();

    let records = records(dir.path());
    assert_eq!(records.len(), 6);
    for record in &records {
        assert_eq!(record.status, IndividualStatus::Crashed);
        assert!(record.error.as_deref().unwrap().contains("diverged"));
        assert_eq!(record.fitness.as_ref().unwrap()["average_force"], -1e6);
        assert_eq!(record.fitness.as_ref().unwrap()["ripple"], 1e6);
    }

    assert_eq!(result.stats.total_evaluations, 6);
    assert_eq!(result.stats.failed_evaluations, 6);
    assert!(result.pareto.is_empty());
    assert!(result.best.is_none());
    assert!(!dir.path().join("best_individual.json").exists());
}

#[test]
fn test_analytic_search_end_to_end() {
    let dir = tempdir().unwrap();
    let config = config(dir.path(), 8, 3);
    let selector = ParetoSelector::new(&config.fitness);
    let mut engine =
        EvolutionEngine::new(config, || Ok::<_, SimulatorError>(AnalyticMotor::default()))
            .unwrap();
    let result = engine.run().unwrap();

    let log = load_run_log(dir.path().join("run_log.json")).unwrap();
    assert_eq!(log.generations.len(), 3);
    assert_eq!(log.len(), 24);

    let pareto: Vec<IndividualRecord> = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("pareto_front.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(pareto.len(), result.pareto.len());
    assert!(pareto.iter().all(|r| r.status == IndividualStatus::Completed));

    // The whole log can only do as well as or better than the final population.
    let analysis = selector.analyze(&log);
    if let (Some(final_best), Some(log_best)) = (result.best_score, analysis.best_score) {
        assert!(log_best >= final_best - 1e-9 * final_best.abs().max(1.0));
    }
}
