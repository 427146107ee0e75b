//! Tubular optimizer CLI - Run design searches and analyze run logs.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tubular_optimizer::{
    compute::{
        AnalyticMotor, MotorConstants, SimulatorError,
        evolution::{EvolutionEngine, ParetoSelector, load_run_log},
    },
    schema::EvolutionConfig,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--example") => print_example_config(),
        Some("run") if args.len() == 3 => run(Path::new(&args[2])),
        Some("analyze") if args.len() == 4 => analyze(Path::new(&args[2]), Path::new(&args[3])),
        _ => {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} run <config.json>", program);
    eprintln!("       {} analyze <config.json> <run_log.json>", program);
    eprintln!("       {} --example", program);
    eprintln!();
    eprintln!("Search tubular linear motor designs from JSON configuration.");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run       Run the configured search, writing the run log as it goes");
    eprintln!("  analyze   Extract the Pareto front and best design from a run log");
    eprintln!();
    eprintln!("Motor constants are read from <config>.motor.json when present.");
    eprintln!("Example configuration is generated with --example flag.");
}

fn load_config(path: &Path) -> EvolutionConfig {
    let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: EvolutionConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }
    config
}

fn load_motor_constants(config_path: &Path) -> MotorConstants {
    let motor_path: PathBuf = config_path.with_extension("motor.json");
    if !motor_path.exists() {
        return MotorConstants::default();
    }
    let motor_str = fs::read_to_string(&motor_path).unwrap_or_else(|e| {
        eprintln!("Error reading motor file: {}", e);
        std::process::exit(1);
    });
    serde_json::from_str(&motor_str).unwrap_or_else(|e| {
        eprintln!("Error parsing motor constants: {}", e);
        std::process::exit(1);
    })
}

fn run(config_path: &Path) {
    let config = load_config(config_path);
    let constants = load_motor_constants(config_path);

    println!("Tubular Motor Design Search");
    println!("===========================");
    println!(
        "Population: {} x {} generations",
        config.population.size, config.population.generations
    );
    println!(
        "Objectives: {}",
        config
            .fitness
            .objectives
            .iter()
            .map(|o| format!("{} ({:+})", o.objective.key(), o.weight))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Limits: {} V, {} W, {} H",
        config.limits.max_voltage, config.limits.max_power, config.limits.max_inductance
    );
    println!("Run log: {}", config.output.run_log.display());
    println!();

    let factory = move || Ok::<_, SimulatorError>(AnalyticMotor::new(constants.clone()));
    let mut engine = EvolutionEngine::new(config, factory).unwrap_or_else(|e| {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let result = engine
        .run_with_callback(|progress| {
            let best = progress
                .best_score
                .map_or_else(|| "none".to_string(), |s| format!("{:.4}", s));
            println!(
                "  Generation {}/{}: best={}, evaluations={}, failed={}, {:.1}s",
                progress.generation,
                progress.total_generations,
                best,
                progress.evaluations_completed,
                progress.failed_evaluations,
                start.elapsed().as_secs_f32()
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!("Pareto front: {} designs", result.pareto.len());
    match (&result.best, result.best_score) {
        (Some(best), Some(score)) => {
            println!("Best score: {:.4}", score);
            println!("{}", serde_json::to_string_pretty(best).unwrap());
        }
        _ => println!("No valid design found"),
    }
}

fn analyze(config_path: &Path, log_path: &Path) {
    let config = load_config(config_path);
    let log = load_run_log(log_path).unwrap_or_else(|e| {
        eprintln!("Error loading run log: {}", e);
        std::process::exit(1);
    });

    let analysis = ParetoSelector::new(&config.fitness).analyze(&log);
    if let Err(e) = analysis.write(
        config.output.pareto.as_deref(),
        config.output.best.as_deref(),
    ) {
        eprintln!("Error writing analysis: {}", e);
        std::process::exit(1);
    }

    println!("Generations: {}", log.generations.len());
    println!("Individuals: {} ({} valid)", analysis.total, analysis.valid);
    println!("Pareto front: {} designs", analysis.pareto.len());
    match (&analysis.best, analysis.best_score) {
        (Some(best), Some(score)) => {
            println!("Best score: {:.4}", score);
            println!("{}", serde_json::to_string_pretty(best).unwrap());
        }
        _ => println!("No valid design found"),
    }
}

fn print_example_config() {
    let config = EvolutionConfig::default();
    let constants = MotorConstants::default();

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
    println!();
    println!("Example motor constants (config.motor.json):");
    println!("{}", serde_json::to_string_pretty(&constants).unwrap());
}
