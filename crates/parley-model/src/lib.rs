//! Numeric building blocks of the Parley negotiation engine.
//!
//! Everything in this crate is a pure function of its inputs: no state, no
//! randomness. The engine in `parley-core` composes these pieces into the
//! bargaining step.
//!
//! # Modules
//!
//! - [`utility`] -- Risk-weighted utility of a normalized policy distance and
//!   the salience-weighted distance itself.
//! - [`voting`] -- Voting rules, little-coalition probabilities and
//!   third-party commitment.
//! - [`pce`] -- Coalition strengths, pairwise victory probabilities and the
//!   probabilistic coalition equilibrium (PCE) over a set of options.
//! - [`error`] -- Error types for violated numeric preconditions.

pub mod error;
pub mod pce;
pub mod utility;
pub mod voting;

pub use error::ModelError;
pub use pce::{scalar_pce, validate_distribution};
pub use utility::{bargain_utility, risk_weighted_utility, weighted_distance};
pub use voting::vote;
