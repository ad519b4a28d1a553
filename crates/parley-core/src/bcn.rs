//! The bargaining step: one full transition from a state to its successor.
//!
//! 1. **Challenge** -- every actor, in parallel, finds its most profitable
//!    rival and, if the expected gain is positive, proposes a compromise
//!    bargain to it.
//! 2. **Register** -- after all proposals are in, each bargain is listed,
//!    in initiator order, by both of its parties. Every list starts with the
//!    status quo.
//! 3. **Resolve** -- every actor, in parallel, scores its candidate list:
//!    each voter's expected utility for each option is averaged over all
//!    actors' positions, and the coalition equilibrium over the options
//!    picks the most likely one (lowest index on ties).
//! 4. **Assemble** -- the chosen positions form the next state. Bargains
//!    are dropped with the step.
//!
//! The parallel phases only read the previous state, so the outcome is
//! identical to serial execution.

// Indices below are actor, option or arena indices bounded by the roster,
// the candidate lists and the bargain arena respectively.
#![allow(clippy::indexing_slicing)]

use nalgebra::DMatrix;
use parley_model::scalar_pce;
use parley_types::{Actor, Position};
use rayon::prelude::*;
use tracing::debug;

use crate::bargain::{Bargain, Candidate, interpolate};
use crate::challenge::best_challenge;
use crate::config::BargainingConfig;
use crate::error::InvariantViolation;
use crate::state::{State, StateUtilities, capability_weights};

/// Slack allowed above 1 for an averaged expected utility.
const EXPECTED_UTILITY_SLACK: f64 = 1e-12;

/// What happened during one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Index of the state that was stepped.
    pub from_state: usize,
    /// Number of bargains proposed.
    pub proposals: usize,
    /// The option each actor chose.
    pub choices: Vec<Choice>,
    /// Whether the stepped state's risk inference was degenerate.
    pub degenerate_risk: bool,
}

impl StepReport {
    /// Number of actors that adopted a bargain rather than the status quo.
    pub fn adopted(&self) -> usize {
        self.choices
            .iter()
            .filter(|c| matches!(c, Choice::Bargain { .. }))
            .count()
    }
}

/// The option an actor chose in resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Kept its position.
    StatusQuo,
    /// Adopted its side of a bargain.
    Bargain {
        /// Initiator of the bargain.
        initiator: usize,
        /// Receiver of the bargain.
        receiver: usize,
    },
}

/// Execute one bargaining step on `state`, whose utilities must already be
/// computed.
///
/// # Errors
///
/// Returns the first [`InvariantViolation`] met in either phase.
pub fn bcn_step(
    state: &State,
    actors: &[Actor],
    config: &BargainingConfig,
) -> Result<(State, StepReport), InvariantViolation> {
    let utilities = state.require_utilities()?;
    let n = actors.len();

    // Phase 1: challenges and proposals.
    let proposals = (0..n)
        .into_par_iter()
        .map(|i| propose(state, utilities, actors, config, i))
        .collect::<Result<Vec<_>, _>>()?;
    let bargains: Vec<Bargain> = proposals.into_iter().flatten().collect();

    let mut candidates = vec![vec![Candidate::StatusQuo]; n];
    for (index, bargain) in bargains.iter().enumerate() {
        candidates[bargain.initiator].push(Candidate::Bargain(index));
        candidates[bargain.receiver].push(Candidate::Bargain(index));
    }

    // Phase 2: resolution.
    let status_quo: Vec<f64> = (0..n).map(|v| utilities.a_util[v].row(v).sum()).collect();
    let resolution = Resolution {
        state,
        utilities,
        actors,
        config,
        bargains: &bargains,
        status_quo: &status_quo,
    };
    let resolved = (0..n)
        .into_par_iter()
        .map(|k| resolution.resolve(k, &candidates[k]))
        .collect::<Result<Vec<_>, _>>()?;

    let (positions, choices): (Vec<Position>, Vec<Choice>) = resolved.into_iter().unzip();
    let report = StepReport {
        from_state: state.index(),
        proposals: bargains.len(),
        choices,
        degenerate_risk: utilities.degenerate_risk,
    };
    Ok((State::successor(state, positions), report))
}

/// Actor `i`'s bargain proposal, if it has a profitable challenge.
fn propose(
    state: &State,
    utilities: &StateUtilities,
    actors: &[Actor],
    config: &BargainingConfig,
    i: usize,
) -> Result<Option<Bargain>, InvariantViolation> {
    let Some(target) = best_challenge(utilities, actors, config, i)? else {
        return Ok(None);
    };
    if target.gain <= 0.0 {
        return Ok(None);
    }

    let j = target.target;
    let positions = state.positions();
    let (initiator_position, receiver_position) = interpolate(
        &actors[i],
        &actors[j],
        &positions[i],
        &positions[j],
        (target.probability, 1.0 - target.probability),
        config.interpolation,
    );
    debug!(
        initiator = i,
        receiver = j,
        probability = target.probability,
        gain = target.gain,
        "Bargain proposed"
    );
    Ok(Some(Bargain {
        initiator: i,
        receiver: j,
        initiator_position,
        receiver_position,
    }))
}

/// Read-only context shared by every actor's resolution.
struct Resolution<'a> {
    state: &'a State,
    utilities: &'a StateUtilities,
    actors: &'a [Actor],
    config: &'a BargainingConfig,
    bargains: &'a [Bargain],
    /// `status_quo[v]`: sum of `v`'s own utilities for every current
    /// position.
    status_quo: &'a [f64],
}

impl Resolution<'_> {
    /// Choose actor `k`'s next position from its candidate list.
    fn resolve(
        &self,
        k: usize,
        candidates: &[Candidate],
    ) -> Result<(Position, Choice), InvariantViolation> {
        let n = self.actors.len();
        let mut expected = DMatrix::zeros(n, candidates.len());
        for (option, candidate) in candidates.iter().enumerate() {
            for v in 0..n {
                let value = self.expected_utility(v, *candidate)?;
                if !(value > 0.0 && value <= 1.0 + EXPECTED_UTILITY_SLACK) {
                    return Err(InvariantViolation::ExpectedUtilityOutOfRange {
                        actor: k,
                        voter: v,
                        option,
                        value,
                    });
                }
                expected[(v, option)] = value;
            }
        }

        let p = scalar_pce(
            &capability_weights(self.actors),
            &expected,
            self.config.voting_rule,
            self.config.victory_model,
            self.config.pce_model,
        )?;
        let best = first_max(p.as_slice());

        match candidates[best] {
            Candidate::StatusQuo => Ok((self.state.positions()[k].clone(), Choice::StatusQuo)),
            Candidate::Bargain(index) => {
                let bargain = &self.bargains[index];
                let position = bargain.position_for(k).ok_or(
                    InvariantViolation::BargainPartyMismatch {
                        actor: k,
                        initiator: bargain.initiator,
                        receiver: bargain.receiver,
                    },
                )?;
                debug!(
                    actor = k,
                    initiator = bargain.initiator,
                    receiver = bargain.receiver,
                    probability = p[best],
                    "Bargain adopted"
                );
                Ok((
                    position.clone(),
                    Choice::Bargain {
                        initiator: bargain.initiator,
                        receiver: bargain.receiver,
                    },
                ))
            }
        }
    }

    /// Voter `v`'s expected utility for one option, averaged over actors.
    fn expected_utility(&self, v: usize, candidate: Candidate) -> Result<f64, InvariantViolation> {
        #[allow(clippy::cast_precision_loss)]
        let n = self.actors.len() as f64;
        let own = &self.utilities.a_util[v];
        let total = match candidate {
            Candidate::StatusQuo => self.status_quo[v],
            Candidate::Bargain(index) => {
                let bargain = &self.bargains[index];
                let proposed = self
                    .state
                    .position_utility(self.actors, v, &bargain.initiator_position)?
                    + self
                        .state
                        .position_utility(self.actors, v, &bargain.receiver_position)?;
                let unchanged: f64 = (0..self.actors.len())
                    .filter(|&m| m != bargain.initiator && m != bargain.receiver)
                    .map(|m| own[(v, m)])
                    .sum();
                proposed + unchanged
            }
        };
        Ok(total / n)
    }
}

/// Index of the first maximal entry.
fn first_max(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = index;
        }
    }
    best
}
