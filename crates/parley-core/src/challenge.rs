//! Pairwise challenges: who can profitably contest whom.
//!
//! In a contest `i : j`, `i` and `j` each contribute their own influence to
//! their side. Every third actor then joins, in index order: it estimates
//! the little-contest probability that `i` prevails with its support, and
//! adds a vote scaled by the configured third-party commitment to the side
//! it favors. The final coalition strengths give the victory probability.
//!
//! The expected value of a contest to a beneficiary `k` blends outright
//! victory with partial adoption: a target with total salience `s_j`
//! concedes fully with weight `1 - s_j` and fights it out with weight
//! `s_j`.

// Matrix and slice indices below are actor indices bounded by the roster.
#![allow(clippy::indexing_slicing)]

use parley_model::vote;
use parley_model::voting::{little_probability, third_party_vote};
use parley_types::Actor;

use crate::config::BargainingConfig;
use crate::error::InvariantViolation;
use crate::state::StateUtilities;

/// Floor on both coalition strengths of a contest.
pub const STRENGTH_FLOOR: f64 = 1e-10;

/// Outcome of evaluating one contest from one perspective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChallengeOutcome {
    /// Probability that the challenger prevails, in `[0, 1]`.
    pub probability: f64,
    /// Beneficiary's expected utility gain over the status quo.
    pub gain: f64,
}

/// A viable challenge target chosen by [`best_challenge`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChallengeTarget {
    /// The rival to challenge.
    pub target: usize,
    /// Probability that the challenger prevails.
    pub probability: f64,
    /// Challenger's expected gain.
    pub gain: f64,
}

/// Evaluate the contest `i : j` from `h`'s point of view, reporting `k`'s
/// expected gain.
///
/// # Errors
///
/// Returns [`InvariantViolation::ContributionSign`] if `i` would vote
/// against itself or `j` for `i`.
pub fn victory_probability_and_gain(
    utilities: &StateUtilities,
    actors: &[Actor],
    config: &BargainingConfig,
    (h, k, i, j): (usize, usize, usize, usize),
) -> Result<ChallengeOutcome, InvariantViolation> {
    let a = &utilities.a_util[h];
    let (actor_i, actor_j) = (&actors[i], &actors[j]);
    let sign_error = |actor, contribution| InvariantViolation::ContributionSign {
        actor,
        challenger: i,
        target: j,
        contribution,
    };

    let status_quo = a[(k, i)] + a[(k, j)];
    let i_wins = 2.0 * a[(k, i)];
    let j_wins = 2.0 * a[(k, j)];

    let contrib_i = vote(actor_i.voting_rule, actor_i.influence(), a[(i, i)], a[(i, j)]);
    if contrib_i < 0.0 {
        return Err(sign_error(i, contrib_i));
    }
    let contrib_j = vote(actor_j.voting_rule, actor_j.influence(), a[(j, i)], a[(j, j)]);
    if contrib_j > 0.0 {
        return Err(sign_error(j, contrib_j));
    }

    let mut strength_i = STRENGTH_FLOOR + contrib_i;
    let mut strength_j = STRENGTH_FLOOR - contrib_j;

    for (n, third) in actors.iter().enumerate() {
        if n == i || n == j {
            continue;
        }
        let weight = third.influence();
        let (u_i, u_j) = (a[(n, i)], a[(n, j)]);
        let p_in = little_probability(third.voting_rule, weight, u_i, u_j, strength_i, strength_j);
        let v = third_party_vote(
            config.third_party_commit,
            third.voting_rule,
            weight,
            p_in,
            u_i,
            u_j,
            a[(n, n)],
        );
        if v > 0.0 {
            strength_i += v;
        } else if v < 0.0 {
            strength_j -= v;
        }
    }

    let probability = strength_i / (strength_i + strength_j);
    let s_j = actor_j.total_salience();
    let contested = probability.mul_add(i_wins, (1.0 - probability) * j_wins);
    let challenge = (1.0 - s_j).mul_add(i_wins, s_j * contested);

    Ok(ChallengeOutcome {
        probability,
        gain: challenge - status_quo,
    })
}

/// The rival `i` gains most by challenging, judged by `i` itself.
///
/// Only gains strictly above `config.min_significance` qualify; among equal
/// gains the lowest index wins. Returns `None` if no rival qualifies.
///
/// # Errors
///
/// Propagates [`victory_probability_and_gain`] failures.
pub fn best_challenge(
    utilities: &StateUtilities,
    actors: &[Actor],
    config: &BargainingConfig,
    i: usize,
) -> Result<Option<ChallengeTarget>, InvariantViolation> {
    let mut best: Option<ChallengeTarget> = None;
    for j in (0..actors.len()).filter(|&j| j != i) {
        let outcome = victory_probability_and_gain(utilities, actors, config, (i, i, i, j))?;
        let beats_best = best.is_none_or(|b| outcome.gain > b.gain);
        if outcome.gain > config.min_significance && beats_best {
            best = Some(ChallengeTarget {
                target: j,
                probability: outcome.probability,
                gain: outcome.gain,
            });
        }
    }
    Ok(best)
}
