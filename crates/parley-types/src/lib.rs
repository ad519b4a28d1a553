//! Shared type definitions for the Parley bargaining simulation.
//!
//! This crate is the single source of truth for the vocabulary used across
//! the Parley workspace: actors, positions, run identifiers, and the policy
//! enumerations that select between sub-models of the negotiation engine.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for run identifiers
//! - [`enums`] -- Policy selectors (voting rules, probability models,
//!   interpolation policies, risk mappings, perspectives)
//! - [`structs`] -- [`Actor`] and [`Position`]

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    InterpolationPolicy, ParseTokenError, PceModel, Perspective, RiskAdjust, RiskRange,
    ThirdPartyCommit, VictoryModel, VotingRule,
};
pub use ids::RunId;
pub use structs::{Actor, Position};
