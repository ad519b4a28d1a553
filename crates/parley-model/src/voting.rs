//! Voting rules and third-party participation in pairwise contests.
//!
//! A vote is a signed influence contribution: positive supports the first
//! option of a pair, negative the second. Its magnitude depends on the
//! voter's weight and, through the [`VotingRule`], on how much the voter
//! prefers one option over the other.

use parley_types::{ThirdPartyCommit, VotingRule};

/// Utility differences smaller than this are treated as indifference by
/// the binary component of a voting rule.
pub const INDIFFERENCE_THRESHOLD: f64 = 1e-8;

/// Signed vote of a voter with weight `weight` on the contest `a : b`,
/// given its utilities `u_a` and `u_b` for the two options.
///
/// The sign always matches the sign of `u_a - u_b` (or is zero), for every
/// rule and any non-negative weight.
pub fn vote(rule: VotingRule, weight: f64, u_a: f64, u_b: f64) -> f64 {
    let du = u_a - u_b;
    let binary = if du > INDIFFERENCE_THRESHOLD {
        1.0
    } else if du < -INDIFFERENCE_THRESHOLD {
        -1.0
    } else {
        0.0
    };
    let cubic = du * du * du;

    match rule {
        VotingRule::Binary => weight * binary,
        VotingRule::PropBin => weight * (du + binary) / 2.0,
        VotingRule::Proportional => weight * du,
        VotingRule::PropCbc => weight * (du + cubic) / 2.0,
        VotingRule::Cubic => weight * cubic,
    }
}

/// Probability that `i` prevails over `j` in the little contest formed when
/// a third party with weight `weight` adds its vote to the current
/// coalition strengths `strength_i` and `strength_j`.
///
/// Both strengths must be strictly positive; the result lies in `[0, 1]`.
pub fn little_probability(
    rule: VotingRule,
    weight: f64,
    u_i: f64,
    u_j: f64,
    strength_i: f64,
    strength_j: f64,
) -> f64 {
    let v = vote(rule, weight, u_i, u_j);
    let with_i = strength_i + v.max(0.0);
    let with_j = strength_j + (-v).max(0.0);
    (with_i / (with_i + with_j)).clamp(0.0, 1.0)
}

/// Signed contribution a third party makes to the contest `i : j`.
///
/// `probability_i` is the little-contest probability that `i` prevails once
/// the third party has joined, `u_i` and `u_j` its utilities for the two
/// positions and `u_own` its utility for its own position. The sign always
/// follows the plain vote on `u_i : u_j`; the policy sets the magnitude:
///
/// - [`ThirdPartyCommit::Full`]: the whole vote counts.
/// - [`ThirdPartyCommit::Semi`]: the vote is scaled by the chance that the
///   favored side actually wins.
/// - [`ThirdPartyCommit::NoCommit`]: the vote is scaled by the share of its
///   own-position utility the favored side would keep, `u_fav / u_own`,
///   clamped to `[0, 1]`. A third party that values its own position at
///   zero or less keeps the whole vote.
pub fn third_party_vote(
    commit: ThirdPartyCommit,
    rule: VotingRule,
    weight: f64,
    probability_i: f64,
    u_i: f64,
    u_j: f64,
    u_own: f64,
) -> f64 {
    let v = vote(rule, weight, u_i, u_j);
    let (favored_probability, favored_utility) = if v > 0.0 {
        (probability_i, u_i)
    } else {
        (1.0 - probability_i, u_j)
    };
    match commit {
        ThirdPartyCommit::Full => v,
        ThirdPartyCommit::Semi => v * favored_probability,
        ThirdPartyCommit::NoCommit => {
            let kept = if u_own > 0.0 {
                (favored_utility / u_own).clamp(0.0, 1.0)
            } else {
                1.0
            };
            v * kept
        }
    }
}
