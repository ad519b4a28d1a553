//! Error types for the parley-core crate.
//!
//! Three families, by when they surface:
//!
//! - [`ValidationError`] -- scenario input out of bounds, raised at load
//!   time. Values are never clamped.
//! - [`EngineError::PerspectiveOutOfRange`] /
//!   [`EngineError::StateOutOfRange`] -- a query naming an actor or state
//!   the model does not have.
//! - [`InvariantViolation`] -- a modeling or numerical defect inside a step.
//!   The driver wraps it in [`EngineError::Invariant`] with the index of the
//!   state being stepped and stops the run.

use parley_model::ModelError;

use crate::config::ConfigError;

/// A scenario that cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The scenario has too few or too many actors.
    #[error("scenario has {count} actors; between {min} and {max} are required")]
    ActorCount {
        /// Number of actors supplied.
        count: usize,
        /// Smallest allowed roster.
        min: usize,
        /// Largest allowed roster.
        max: usize,
    },

    /// The scenario has no policy dimensions.
    #[error("scenario has no dimensions")]
    NoDimensions,

    /// A row does not have the number of fields its header promises.
    #[error("row {row} has {actual} fields, expected {expected}")]
    RaggedRow {
        /// One-based row (line) number.
        row: usize,
        /// Fields required by the header.
        expected: usize,
        /// Fields found.
        actual: usize,
    },

    /// The file ends before every actor announced in the header has a row.
    #[error("header announces {expected} actors but only {actual} rows follow")]
    MissingRows {
        /// Actors announced in the header.
        expected: usize,
        /// Actor rows present.
        actual: usize,
    },

    /// A field that must be numeric is not.
    #[error("row {row}, column {column}: {value:?} is not a number")]
    MalformedNumber {
        /// One-based row (line) number.
        row: usize,
        /// One-based column number.
        column: usize,
        /// The offending text.
        value: String,
    },

    /// An actor record violates a field bound (empty name, negative
    /// capability, percentage outside `[0, 100]`, ...).
    #[error("actor {actor:?}: {source}")]
    Actor {
        /// Name of the offending actor (may be empty).
        actor: String,
        /// Field-level validation failures.
        source: validator::ValidationErrors,
    },

    /// An actor's saliences add up to more than 100 percent.
    #[error("actor {actor:?}: total salience {total} exceeds 100")]
    SalienceTotal {
        /// Name of the offending actor.
        actor: String,
        /// The sum of its salience percentages.
        total: f64,
    },

    /// An actor attaches no salience to any dimension, so no distance to
    /// its position can be measured.
    #[error("actor {actor:?}: every salience is zero")]
    ZeroSalience {
        /// Name of the offending actor.
        actor: String,
    },

    /// An actor's position or salience vector does not match the
    /// scenario's dimensions.
    #[error("actor {actor:?} has {actual} {what} values, expected {expected}")]
    DimensionMismatch {
        /// Name of the offending actor.
        actor: String,
        /// Which vector is malformed.
        what: &'static str,
        /// Number of dimensions in the scenario.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// Failed to read a scenario file.
    #[error("failed to read scenario file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse a YAML scenario.
    #[error("failed to parse scenario YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },
}

/// A modeling or numerical defect detected inside a bargaining step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    /// A numeric precondition failed in the utility or equilibrium model.
    #[error("model error: {source}")]
    Model {
        /// The underlying model error.
        #[from]
        source: ModelError,
    },

    /// A contestant's contribution to its own side has the wrong sign.
    #[error(
        "actor {actor} contributes {contribution} against itself in the contest {challenger} : {target}"
    )]
    ContributionSign {
        /// The contestant whose contribution is wrong.
        actor: usize,
        /// The challenger of the contest.
        challenger: usize,
        /// The target of the contest.
        target: usize,
        /// The offending contribution.
        contribution: f64,
    },

    /// An expected utility in the resolution matrix is outside `(0, 1]`.
    #[error("actor {actor}: voter {voter} values option {option} at {value}, outside (0, 1]")]
    ExpectedUtilityOutOfRange {
        /// The actor whose options are being resolved.
        actor: usize,
        /// The voter whose utility is out of range.
        voter: usize,
        /// Index of the option in the actor's candidate list.
        option: usize,
        /// The offending value.
        value: f64,
    },

    /// A bargain won an actor's resolution but does not involve that actor.
    #[error("actor {actor} resolved to a bargain between {initiator} and {receiver}")]
    BargainPartyMismatch {
        /// The actor being resolved.
        actor: usize,
        /// Initiator of the winning bargain.
        initiator: usize,
        /// Receiver of the winning bargain.
        receiver: usize,
    },

    /// Utilities were read from a state whose derived data is absent.
    #[error("state utilities have not been computed")]
    UtilitiesMissing,
}

/// Errors surfaced by the engine to its callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The scenario failed validation.
    #[error("validation error: {source}")]
    Validation {
        /// The underlying validation error.
        #[from]
        source: ValidationError,
    },

    /// A perspective names an actor that does not exist.
    #[error("configuration error: perspective {index} is out of range for {actors} actors")]
    PerspectiveOutOfRange {
        /// The requested perspective holder.
        index: usize,
        /// Number of actors in the model.
        actors: usize,
    },

    /// A state index beyond the end of the history.
    #[error("state {index} does not exist; the history holds {states} states")]
    StateOutOfRange {
        /// The requested state index.
        index: usize,
        /// Number of states in the history.
        states: usize,
    },

    /// The configuration file could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// An invariant failed while stepping a state; the run is aborted.
    #[error("invariant violated at state {state_index}: {source}")]
    Invariant {
        /// Index in the history of the state being stepped.
        state_index: usize,
        /// The violated invariant.
        source: InvariantViolation,
    },
}

impl EngineError {
    /// Wrap an invariant violation with the index of the failing state.
    pub const fn invariant(state_index: usize, source: InvariantViolation) -> Self {
        Self::Invariant {
            state_index,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_queries_name_the_bounds() {
        let err = EngineError::PerspectiveOutOfRange { index: 7, actors: 3 };
        assert!(err.to_string().contains("perspective 7"));
        let err = EngineError::StateOutOfRange { index: 9, states: 2 };
        assert!(err.to_string().contains("holds 2 states"));
    }

    #[test]
    fn invariant_errors_name_the_state() {
        let err = EngineError::invariant(4, InvariantViolation::UtilitiesMissing);
        assert!(err.to_string().starts_with("invariant violated at state 4"));
    }
}
