//! State history, bargaining step and run driver for the Parley simulation.
//!
//! A [`Model`] holds a fixed roster of actors and an append-only history of
//! [`State`]s. Each call to [`bcn_step`] turns the latest state into its
//! successor through two data-parallel phases: every actor challenges its
//! most profitable rival and proposes a compromise, then every actor picks
//! the option the coalition equilibrium favours from the bargains it is
//! party to. [`Model::run`] repeats the step until a [`StopCondition`]
//! fires.
//!
//! # Modules
//!
//! - [`bargain`] -- Bargain proposals and the interpolation of compromise
//!   positions.
//! - [`bcn`] -- The two-phase bargaining step and its [`StepReport`].
//! - [`challenge`] -- Expected gain and victory probability of challenges.
//! - [`config`] -- Configuration loading from `parley-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- Validation, invariant and engine error types.
//! - [`model`] -- [`Model`], its [`History`] and the run loop.
//! - [`observer`] -- [`StepObserver`] trait and [`NoOpObserver`].
//! - [`random`] -- Seeded random scenario generation.
//! - [`report`] -- History reports as text tables and JSON.
//! - [`scenario`] -- CSV and YAML scenario files.
//! - [`state`] -- Per-state derived utilities and probability
//!   distributions.
//! - [`stop`] -- Stopping conditions and the state distance.

pub mod bargain;
pub mod bcn;
pub mod challenge;
pub mod config;
pub mod error;
pub mod model;
pub mod observer;
pub mod random;
pub mod report;
pub mod scenario;
pub mod state;
pub mod stop;

pub use bcn::{Choice, StepReport, bcn_step};
pub use config::{BargainingConfig, EngineConfig};
pub use error::{EngineError, InvariantViolation, ValidationError};
pub use model::{History, Model, RunSummary};
pub use observer::{NoOpObserver, StepObserver};
pub use random::random_scenario;
pub use report::HistoryReport;
pub use scenario::Scenario;
pub use state::State;
pub use stop::{StopCondition, StopPolicy, StopReason};
