//! Stopping conditions for a run.
//!
//! A run consults its [`StopCondition`] before every step with the number
//! of steps completed so far and the history. [`StopPolicy`] covers the
//! usual cases; any `Fn(u32, &History) -> bool` works as a custom
//! condition.

use serde::{Deserialize, Serialize};

use crate::model::History;
use crate::state::State;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The iteration cap was reached.
    MaxIterations,
    /// The latest step moved too little relative to the first.
    Quiescent,
    /// A caller-supplied condition fired.
    Custom,
}

/// Decides, before each step, whether the run is over.
pub trait StopCondition {
    /// `Some(reason)` to stop after `iterations` completed steps.
    fn should_stop(&self, iterations: u32, history: &History) -> Option<StopReason>;
}

impl<F> StopCondition for F
where
    F: Fn(u32, &History) -> bool,
{
    fn should_stop(&self, iterations: u32, history: &History) -> Option<StopReason> {
        self(iterations, history).then_some(StopReason::Custom)
    }
}

/// Built-in stopping policies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Stop after a fixed number of steps.
    MaxIterations(u32),
    /// Stop after `max_iterations` steps, or as soon as a step moves no
    /// more than the first step's distance divided by `quiet_factor`.
    Quiescence {
        /// Hard cap on the number of steps.
        max_iterations: u32,
        /// Ratio of first-step movement to latest-step movement that counts
        /// as quiet.
        quiet_factor: f64,
    },
}

impl StopCondition for StopPolicy {
    fn should_stop(&self, iterations: u32, history: &History) -> Option<StopReason> {
        match *self {
            Self::MaxIterations(max) => (iterations >= max).then_some(StopReason::MaxIterations),
            Self::Quiescence {
                max_iterations,
                quiet_factor,
            } => {
                if is_quiet(history, quiet_factor) {
                    Some(StopReason::Quiescent)
                } else {
                    (iterations >= max_iterations).then_some(StopReason::MaxIterations)
                }
            }
        }
    }
}

/// True once the latest step moved no more than the first step's distance
/// over `quiet_factor` (or not at all).
fn is_quiet(history: &History, quiet_factor: f64) -> bool {
    let (Some(first), Some(last)) = (history.first_step_distance(), history.last_step_distance())
    else {
        return false;
    };
    last <= 0.0 || last < first / quiet_factor
}

/// Sum over actors of the Euclidean distance each actor moved between two
/// states.
pub fn state_distance(a: &State, b: &State) -> f64 {
    a.positions()
        .iter()
        .zip(b.positions())
        .map(|(p, q)| p.distance(q))
        .sum()
}
