//! Command-line arguments for the `parley` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_core::EngineConfig;
use parley_types::{
    InterpolationPolicy, PceModel, Perspective, RiskAdjust, RiskRange, ThirdPartyCommit,
    VictoryModel, VotingRule,
};

/// Run a bargaining-and-coalition negotiation model.
#[derive(Debug, Parser)]
#[command(name = "parley", version)]
#[command(about = "Bargaining and coalition negotiation simulation")]
pub struct Cli {
    /// What to run.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "parley-config.yaml")]
    pub config: PathBuf,

    /// Seed for random scenarios (overrides the config and `PARLEY_SEED`).
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Hard cap on bargaining steps.
    #[arg(long, global = true)]
    pub max_iterations: Option<u32>,

    /// Write the history report as JSON to this file.
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    /// Whose estimates the report's probabilities use: `own`, or an actor
    /// index.
    #[arg(long, global = true, default_value = "own")]
    pub perspective: Perspective,

    /// Voting rule token (binary, prop_bin, proportional, prop_cbc, cubic).
    #[arg(long, global = true)]
    pub voting_rule: Option<VotingRule>,

    /// Victory model token (linear, square).
    #[arg(long, global = true)]
    pub victory_model: Option<VictoryModel>,

    /// Equilibrium model token (conditional, markov).
    #[arg(long, global = true)]
    pub pce_model: Option<PceModel>,

    /// Third-party commitment token (no_commit, semi, full).
    #[arg(long, global = true)]
    pub third_party_commit: Option<ThirdPartyCommit>,

    /// Interpolation policy token (s1p1, s2p2, s2pmax).
    #[arg(long, global = true)]
    pub interpolation: Option<InterpolationPolicy>,

    /// Risk range token (min, mid, max).
    #[arg(long, global = true)]
    pub risk_range: Option<RiskRange>,

    /// Risk adjustment token (full, half, own).
    #[arg(long, global = true)]
    pub risk_adjust: Option<RiskAdjust>,
}

/// Where the scenario comes from.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a random scenario from the seed and run it.
    Random {
        /// Number of actors.
        #[arg(long, default_value_t = 15)]
        actors: usize,
        /// Number of policy dimensions.
        #[arg(long, default_value_t = 3)]
        dimensions: usize,
    },
    /// Load a scenario file (`.csv`, otherwise YAML) and run it.
    Scenario {
        /// Path to the scenario file.
        path: PathBuf,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.run.max_iterations = max_iterations;
        }

        let bargaining = &mut config.bargaining;
        if let Some(rule) = self.voting_rule {
            bargaining.voting_rule = rule;
        }
        if let Some(model) = self.victory_model {
            bargaining.victory_model = model;
        }
        if let Some(model) = self.pce_model {
            bargaining.pce_model = model;
        }
        if let Some(commit) = self.third_party_commit {
            bargaining.third_party_commit = commit;
        }
        if let Some(policy) = self.interpolation {
            bargaining.interpolation = policy;
        }
        if let Some(range) = self.risk_range {
            bargaining.risk_range = range;
        }
        if let Some(adjust) = self.risk_adjust {
            bargaining.risk_adjust = adjust;
        }
    }
}
