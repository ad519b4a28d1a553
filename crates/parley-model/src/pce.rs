//! Probabilistic coalition equilibrium (PCE) over a set of options.
//!
//! Given a population of voters with weights and a utility matrix
//! `u[voter][option]`, the equilibrium is computed in three stages:
//!
//! 1. **Coalitions** -- `c[a][b]` is the total positive vote for option `a`
//!    over option `b`, plus a small floor so no strength is ever zero.
//! 2. **Victory probabilities** -- `P[a > b]` from `c[a][b]` and `c[b][a]`
//!    under the selected [`VictoryModel`]; the diagonal is always 1/2.
//! 3. **Equilibrium** -- a probability vector over options under the
//!    selected [`PceModel`].
//!
//! The result always sums to one within [`PROBABILITY_TOLERANCE`]; anything
//! else is reported as a [`ModelError`].

// Matrix indices below are bounded by the option and voter counts checked
// on entry.
#![allow(clippy::indexing_slicing)]

use nalgebra::{DMatrix, DVector};
use parley_types::{PceModel, VictoryModel, VotingRule};
use tracing::warn;

use crate::error::ModelError;
use crate::voting::vote;

/// Floor added to every coalition strength.
pub const COALITION_FLOOR: f64 = 1e-8;

/// Allowed deviation of a probability vector's sum from one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-8;

/// Convergence threshold for the Markov equilibrium (max component change).
const MARKOV_TOLERANCE: f64 = 1e-13;

/// Iteration cap for the Markov equilibrium.
const MARKOV_MAX_ITERATIONS: u32 = 100_000;

/// Coalition strengths `c[a][b]` for every ordered pair of options.
///
/// `utilities` has one row per voter and one column per option; `weights`
/// has one entry per voter.
pub fn coalitions(
    weights: &DVector<f64>,
    utilities: &DMatrix<f64>,
    rule: VotingRule,
) -> Result<DMatrix<f64>, ModelError> {
    let voters = utilities.nrows();
    let options = utilities.ncols();
    if weights.len() != voters {
        return Err(ModelError::ShapeMismatch {
            what: "weight vector",
            expected: (voters, 1),
            actual: (weights.len(), 1),
        });
    }

    Ok(DMatrix::from_fn(options, options, |a, b| {
        (0..voters).fold(COALITION_FLOOR, |strength, k| {
            let v = vote(rule, weights[k], utilities[(k, a)], utilities[(k, b)]);
            if v > 0.0 { strength + v } else { strength }
        })
    }))
}

/// Pairwise victory probabilities `P[a > b]` from coalition strengths.
///
/// Satisfies `P[a > b] + P[b > a] = 1` and `P[a > a] = 1/2`.
pub fn victory_probabilities(coalitions: &DMatrix<f64>, model: VictoryModel) -> DMatrix<f64> {
    let options = coalitions.nrows();
    DMatrix::from_fn(options, options, |a, b| {
        let (for_a, for_b) = match model {
            VictoryModel::Linear => (coalitions[(a, b)], coalitions[(b, a)]),
            VictoryModel::Square => (
                coalitions[(a, b)] * coalitions[(a, b)],
                coalitions[(b, a)] * coalitions[(b, a)],
            ),
        };
        for_a / (for_a + for_b)
    })
}

/// Conditional equilibrium: the probability that option `a` beats every
/// alternative, conditioned on some option doing so.
///
/// Products are accumulated in log space so that large option sets do not
/// underflow to an all-zero vector.
pub fn conditional_pce(victory: &DMatrix<f64>) -> DVector<f64> {
    let options = victory.nrows();
    let log_scores = DVector::from_fn(options, |a, _| {
        (0..options).map(|b| victory[(a, b)].ln()).sum::<f64>()
    });
    let peak = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let scores = log_scores.map(|s| (s - peak).exp());
    let total = scores.sum();
    scores / total
}

/// Markov equilibrium: the stationary distribution of the chain in which a
/// uniformly chosen challenger `a` displaces the incumbent `b` with
/// probability `P[a > b]`.
#[allow(clippy::cast_precision_loss)]
pub fn markov_pce(victory: &DMatrix<f64>) -> DVector<f64> {
    let options = victory.nrows();
    let n = options as f64;

    // Column-stochastic transition matrix: t[a][b] = P(b -> a).
    let mut transition = DMatrix::from_fn(options, options, |a, b| {
        if a == b { 0.0 } else { victory[(a, b)] / n }
    });
    for b in 0..options {
        let leave: f64 = transition.column(b).sum();
        transition[(b, b)] = 1.0 - leave;
    }

    let mut p = DVector::from_element(options, 1.0 / n);
    let mut change = f64::INFINITY;
    for _ in 0..MARKOV_MAX_ITERATIONS {
        let mut next = &transition * &p;
        let total = next.sum();
        next /= total;
        change = (&next - &p).amax();
        p = next;
        if change < MARKOV_TOLERANCE {
            return p;
        }
    }
    warn!(options, change, "Markov equilibrium did not converge");
    p
}

/// Check that `p` is a probability vector: entries in `[0, 1]`, summing to
/// one within [`PROBABILITY_TOLERANCE`].
pub fn validate_distribution(p: &DVector<f64>) -> Result<(), ModelError> {
    for (index, &value) in p.iter().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(ModelError::ProbabilityOutOfRange { index, value });
        }
    }
    let sum = p.sum();
    if (sum - 1.0).abs() < PROBABILITY_TOLERANCE {
        Ok(())
    } else {
        Err(ModelError::ProbabilityNotNormalized { sum })
    }
}

/// Equilibrium distribution over the options of a victory-probability
/// matrix, validated before it is returned.
pub fn equilibrium(victory: &DMatrix<f64>, model: PceModel) -> Result<DVector<f64>, ModelError> {
    if victory.nrows() == 0 {
        return Err(ModelError::NoOptions);
    }
    let p = match model {
        PceModel::Conditional => conditional_pce(victory),
        PceModel::Markov => markov_pce(victory),
    };
    validate_distribution(&p)?;
    Ok(p)
}

/// Full PCE pipeline: voter weights and a `voters x options` utility
/// matrix in, a probability distribution over options out.
///
/// # Errors
///
/// - [`ModelError::NoOptions`] if the utility matrix has no columns.
/// - [`ModelError::ShapeMismatch`] if `weights` does not match the voters.
/// - [`ModelError::ProbabilityNotNormalized`] or
///   [`ModelError::ProbabilityOutOfRange`] if the result is not a valid
///   distribution (for example because a utility was NaN).
pub fn scalar_pce(
    weights: &DVector<f64>,
    utilities: &DMatrix<f64>,
    rule: VotingRule,
    victory_model: VictoryModel,
    pce_model: PceModel,
) -> Result<DVector<f64>, ModelError> {
    if utilities.ncols() == 0 {
        return Err(ModelError::NoOptions);
    }
    let strengths = coalitions(weights, utilities, rule)?;
    let victory = victory_probabilities(&strengths, victory_model);
    equilibrium(&victory, pce_model)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn three_actor_utilities() -> (DVector<f64>, DMatrix<f64>) {
        // Positions 0, 0.5, 1 on one dimension, risk neutral.
        let u = DMatrix::from_row_slice(3, 3, &[
            1.0, 0.5, 0.0,
            0.5, 1.0, 0.5,
            0.0, 0.5, 1.0,
        ]);
        (DVector::from_element(3, 50.0), u)
    }

    #[test]
    fn coalitions_have_floor_on_diagonal() {
        let (w, u) = three_actor_utilities();
        let c = coalitions(&w, &u, VotingRule::Proportional).unwrap();
        for a in 0..3 {
            assert!((c[(a, a)] - COALITION_FLOOR).abs() < 1e-20);
        }
        // Option 1 over option 0: actor 1 (+25) and actor 2 (+25).
        assert!((c[(1, 0)] - (50.0 + COALITION_FLOOR)).abs() < 1e-9);
    }

    #[test]
    fn victory_probabilities_are_complementary() {
        let (w, u) = three_actor_utilities();
        for model in [VictoryModel::Linear, VictoryModel::Square] {
            let p = victory_probabilities(&coalitions(&w, &u, VotingRule::Proportional).unwrap(), model);
            for a in 0..3 {
                assert!((p[(a, a)] - 0.5).abs() < 1e-12);
                for b in 0..3 {
                    assert!((p[(a, b)] + p[(b, a)] - 1.0).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn central_option_is_most_likely() {
        let (w, u) = three_actor_utilities();
        for pce in [PceModel::Conditional, PceModel::Markov] {
            let p = scalar_pce(&w, &u, VotingRule::Proportional, VictoryModel::Linear, pce).unwrap();
            assert!((p.sum() - 1.0).abs() < PROBABILITY_TOLERANCE);
            assert!(p[1] > p[0], "{pce}");
            assert!((p[0] - p[2]).abs() < 1e-9, "{pce}");
        }
    }

    #[test]
    fn conditional_matches_product_formula() {
        let (w, u) = three_actor_utilities();
        let p = scalar_pce(&w, &u, VotingRule::Proportional, VictoryModel::Linear, PceModel::Conditional).unwrap();
        // Outer options each lose 2:1 to the centre and tie each other.
        // Scores: outer = 0.5 * (1/3) * 0.5, centre = 0.5 * (2/3) * (2/3).
        let outer = 0.5 * (1.0 / 3.0) * 0.5;
        let centre = 0.5 * (2.0 / 3.0) * (2.0 / 3.0);
        let total = 2.0_f64.mul_add(outer, centre);
        assert!((p[1] - centre / total).abs() < 1e-7);
    }

    #[test]
    fn single_option_gets_everything() {
        let u = DMatrix::from_element(4, 1, 0.7);
        let w = DVector::from_element(4, 1.0);
        let p = scalar_pce(&w, &u, VotingRule::Binary, VictoryModel::Square, PceModel::Markov).unwrap();
        assert!((p[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn large_option_sets_do_not_underflow() {
        let options = 400;
        let u = DMatrix::from_fn(3, options, |k, m| if m == k { 1.0 } else { 0.0 });
        let w = DVector::from_element(3, 1.0);
        let p = scalar_pce(&w, &u, VotingRule::Proportional, VictoryModel::Linear, PceModel::Conditional).unwrap();
        assert!((p.sum() - 1.0).abs() < PROBABILITY_TOLERANCE);
    }

    #[test]
    fn errors_on_empty_or_misshapen_input() {
        let w = DVector::from_element(2, 1.0);
        let empty = DMatrix::<f64>::zeros(2, 0);
        assert_eq!(
            scalar_pce(&w, &empty, VotingRule::Proportional, VictoryModel::Linear, PceModel::Conditional),
            Err(ModelError::NoOptions)
        );
        let u = DMatrix::from_element(3, 2, 0.5);
        assert!(matches!(
            scalar_pce(&w, &u, VotingRule::Proportional, VictoryModel::Linear, PceModel::Conditional),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn nan_votes_are_dropped_and_bad_distributions_rejected() {
        let u = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, 0.0, 1.0]);
        let w = DVector::from_element(2, 1.0);
        let result = scalar_pce(&w, &u, VotingRule::Proportional, VictoryModel::Linear, PceModel::Conditional);
        // NaN votes are not positive, so they never enter a coalition.
        assert!(result.is_ok());

        let bad = DVector::from_vec(vec![0.7, 0.7]);
        assert!(matches!(
            validate_distribution(&bad),
            Err(ModelError::ProbabilityNotNormalized { .. })
        ));
        let negative = DVector::from_vec(vec![1.2, -0.2]);
        assert!(matches!(
            validate_distribution(&negative),
            Err(ModelError::ProbabilityOutOfRange { index: 0, .. })
        ));
    }
}
