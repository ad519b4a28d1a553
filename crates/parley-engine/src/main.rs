//! Command-line runner for the Parley bargaining simulation.
//!
//! Loads configuration, builds a model from a scenario file or a seeded
//! random scenario, runs it to quiescence and prints the history report.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration from `parley-config.yaml` and apply overrides
//! 3. Initialize structured logging (tracing)
//! 4. Load or generate the scenario
//! 5. Run the model until quiescence or the iteration cap
//! 6. Print the report and optionally export it as JSON

mod cli;
mod progress;

use std::path::Path;

use anyhow::Context as _;
use clap::Parser as _;
use parley_core::{EngineConfig, HistoryReport, Model, Scenario, random_scenario};
use rand::SeedableRng as _;
use rand_chacha::ChaCha20Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::progress::ProgressObserver;

fn main() -> anyhow::Result<()> {
    // 1. Parse the command line.
    let cli = Cli::parse();

    // 2. Load configuration.
    let mut config = load_config(&cli.config)?;
    cli.apply_overrides(&mut config);

    // 3. Initialize structured logging.
    let level = config.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(true)
        .init();

    info!(
        seed = config.run.seed,
        max_iterations = config.run.max_iterations,
        quiet_factor = config.run.quiet_factor,
        voting_rule = %config.bargaining.voting_rule,
        pce_model = %config.bargaining.pce_model,
        "Configuration loaded"
    );

    // 4. Load or generate the scenario.
    let scenario = match &cli.command {
        Command::Random { actors, dimensions } => {
            let mut rng = ChaCha20Rng::seed_from_u64(config.run.seed);
            let scenario = random_scenario(*actors, *dimensions, &mut rng);
            info!(
                seed = config.run.seed,
                actors, dimensions, "Random scenario generated"
            );
            scenario
        }
        Command::Scenario { path } => Scenario::load(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
    };

    // 5. Run the model.
    let stop = config.stop_policy();
    let mut model = Model::from_scenario(scenario, config.bargaining)?;
    let mut observer = ProgressObserver::default();
    let summary = model.run(&stop, &mut observer)?;
    info!(
        run_id = %summary.run_id,
        iterations = summary.iterations,
        reason = ?summary.stop_reason,
        final_distance = summary.final_distance,
        degenerate_steps = observer.degenerate_steps(),
        "parley run complete"
    );

    // 6. Report.
    let report = HistoryReport::build(&model, cli.perspective)?;
    println!("{report}");
    if let Some(path) = &cli.report {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

/// Load the engine configuration, falling back to defaults (plus the
/// environment seed override) when `path` does not exist.
fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    if path.exists() {
        EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))
    } else {
        let mut config = EngineConfig::default();
        config.run.apply_env_overrides()?;
        Ok(config)
    }
}
