//! Error types for the parley-model crate.
//!
//! These errors signal that a numeric precondition or invariant was
//! violated: a modeling or numerical defect, never a recoverable condition.
//! Callers propagate them and abort the run.

/// Errors raised by the utility, voting and equilibrium functions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Two vectors that must be aligned by dimension differ in length.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The required length.
        expected: usize,
        /// The length supplied.
        actual: usize,
    },

    /// A salience weight is negative or not a number.
    #[error("negative salience {value} on dimension {dimension}")]
    NegativeSalience {
        /// The offending dimension.
        dimension: usize,
        /// The offending value.
        value: f64,
    },

    /// Every salience weight is zero, so no distance is defined.
    #[error("total salience is zero")]
    ZeroSalience,

    /// A distance evaluated to NaN or infinity.
    #[error("distance is not finite: {value}")]
    NonFiniteDistance {
        /// The computed value.
        value: f64,
    },

    /// A matrix or vector does not have the shape the operation requires.
    #[error("{what} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Which operand is malformed.
        what: &'static str,
        /// Required `(rows, columns)`.
        expected: (usize, usize),
        /// Supplied `(rows, columns)`.
        actual: (usize, usize),
    },

    /// An equilibrium was requested over an empty option set.
    #[error("no options to choose between")]
    NoOptions,

    /// A probability vector does not sum to one.
    #[error("probability vector sums to {sum}, not 1")]
    ProbabilityNotNormalized {
        /// The actual sum.
        sum: f64,
    },

    /// A probability lies outside `[0, 1]`.
    #[error("probability {value} at index {index} is outside [0, 1]")]
    ProbabilityOutOfRange {
        /// Position of the entry in the vector.
        index: usize,
        /// The offending value.
        value: f64,
    },
}
