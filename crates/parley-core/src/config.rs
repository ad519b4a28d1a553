//! Configuration loading and typed config structures for the Parley engine.
//!
//! The canonical configuration lives in `parley-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure and a loader that reads it. Every field has a default, so an
//! empty file (or no file at all) yields a runnable configuration.
//!
//! Selector fields (`voting_rule`, `pce_model`, ...) are parsed from their
//! lowercase tokens; an unrecognized token fails the whole load.

use std::path::Path;

use parley_types::{
    InterpolationPolicy, PceModel, RiskAdjust, RiskRange, ThirdPartyCommit, VictoryModel,
    VotingRule,
};
use serde::{Deserialize, Serialize};

use crate::stop::StopPolicy;

/// Environment variable that overrides `run.seed`.
pub const SEED_ENV_VAR: &str = "PARLEY_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The seed override in the environment is not an unsigned integer.
    #[error("{SEED_ENV_VAR} must be an unsigned integer, got {value:?}")]
    InvalidSeedOverride {
        /// The value found in the environment.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `parley-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run length, seed and stopping parameters.
    #[serde(default)]
    pub run: RunConfig,

    /// Sub-model selection for the bargaining step.
    #[serde(default)]
    pub bargaining: BargainingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `PARLEY_SEED`, when set, overrides `run.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML or carries an
    /// unrecognized selector token, or [`ConfigError::InvalidSeedOverride`]
    /// if the environment override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.run.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Environment overrides are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// The stopping policy described by the `run` section.
    pub const fn stop_policy(&self) -> StopPolicy {
        StopPolicy::Quiescence {
            max_iterations: self.run.max_iterations,
            quiet_factor: self.run.quiet_factor,
        }
    }
}

/// Run-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seed for random scenario generation.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Hard cap on the number of bargaining steps.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// A run is quiescent once a step moves less than the first step's
    /// distance divided by this factor.
    #[serde(default = "default_quiet_factor")]
    pub quiet_factor: f64,
}

impl RunConfig {
    /// Override the seed from `PARLEY_SEED` when it is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSeedOverride`] if the variable is set
    /// but does not parse as a `u64`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(SEED_ENV_VAR) {
            self.seed = value
                .trim()
                .parse()
                .map_err(|_parse| ConfigError::InvalidSeedOverride { value })?;
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_iterations: default_max_iterations(),
            quiet_factor: default_quiet_factor(),
        }
    }
}

/// Bargaining sub-model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BargainingConfig {
    /// Rule used when aggregating votes over options.
    #[serde(default)]
    pub voting_rule: VotingRule,

    /// How coalition strengths become victory probabilities.
    #[serde(default)]
    pub victory_model: VictoryModel,

    /// How victory probabilities become a distribution over options.
    #[serde(default)]
    pub pce_model: PceModel,

    /// How firmly third parties commit to the side they favor.
    #[serde(default)]
    pub third_party_commit: ThirdPartyCommit,

    /// How a bargain's compromise positions are computed.
    #[serde(default)]
    pub interpolation: InterpolationPolicy,

    /// Range onto which equilibrium probabilities are mapped as risk
    /// attitudes.
    #[serde(default)]
    pub risk_range: RiskRange,

    /// How a perspective holder estimates other actors' risk attitudes.
    #[serde(default)]
    pub risk_adjust: RiskAdjust,

    /// Smallest expected gain that justifies a challenge.
    #[serde(default = "default_min_significance")]
    pub min_significance: f64,
}

impl Default for BargainingConfig {
    fn default() -> Self {
        Self {
            voting_rule: VotingRule::default(),
            victory_model: VictoryModel::default(),
            pce_model: PceModel::default(),
            third_party_commit: ThirdPartyCommit::default(),
            interpolation: InterpolationPolicy::default(),
            risk_range: RiskRange::default(),
            risk_adjust: RiskAdjust::default(),
            min_significance: default_min_significance(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_max_iterations() -> u32 {
    100
}

const fn default_quiet_factor() -> f64 {
    100.0
}

const fn default_min_significance() -> f64 {
    1e-5
}

fn default_log_level() -> String {
    "info".to_owned()
}
