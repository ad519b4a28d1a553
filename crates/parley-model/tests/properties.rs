//! Property tests for the utility engine and the coalition equilibrium.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use nalgebra::{DMatrix, DVector};
use parley_model::pce::PROBABILITY_TOLERANCE;
use parley_model::{risk_weighted_utility, scalar_pce, weighted_distance};
use parley_types::{PceModel, VictoryModel, VotingRule};
use proptest::prelude::*;

fn voting_rule() -> impl Strategy<Value = VotingRule> {
    prop_oneof![
        Just(VotingRule::Binary),
        Just(VotingRule::PropBin),
        Just(VotingRule::Proportional),
        Just(VotingRule::PropCbc),
        Just(VotingRule::Cubic),
    ]
}

fn victory_model() -> impl Strategy<Value = VictoryModel> {
    prop_oneof![Just(VictoryModel::Linear), Just(VictoryModel::Square)]
}

fn pce_model() -> impl Strategy<Value = PceModel> {
    prop_oneof![Just(PceModel::Conditional), Just(PceModel::Markov)]
}

/// Weights and a `voters x options` utility matrix of matching shape.
fn weighted_utilities() -> impl Strategy<Value = (DVector<f64>, DMatrix<f64>)> {
    (1_usize..8, 1_usize..10).prop_flat_map(|(voters, options)| {
        (
            prop::collection::vec(0.0_f64..200.0, voters),
            prop::collection::vec(0.0_f64..=1.0, voters * options),
        )
            .prop_map(move |(w, u)| {
                (
                    DVector::from_vec(w),
                    DMatrix::from_row_slice(voters, options, &u),
                )
            })
    })
}

proptest! {
    #[test]
    fn utility_is_bounded_on_unit_interval(d in 0.0_f64..=1.0, r in -1.0_f64..=1.0) {
        let u = risk_weighted_utility(d, r);
        prop_assert!((0.0..=1.0).contains(&u), "u({d}, {r}) = {u}");
    }

    #[test]
    fn utility_is_one_at_zero_and_zero_at_one(r in -1.0_f64..=1.0) {
        prop_assert!((risk_weighted_utility(0.0, r) - 1.0).abs() < 1e-12);
        prop_assert!(risk_weighted_utility(1.0, r).abs() < 1e-12);
    }

    #[test]
    fn distance_is_non_negative(
        pairs in prop::collection::vec((-1.0_f64..=1.0, 0.0_f64..=1.0), 1..6)
    ) {
        let (diff, salience): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        prop_assume!(salience.iter().any(|&s| s > 0.0));
        let d = weighted_distance(&diff, &salience).unwrap();
        prop_assert!(d >= 0.0);

        let salient_diff_is_zero = diff
            .iter()
            .zip(&salience)
            .all(|(&x, &s)| s == 0.0 || x == 0.0);
        prop_assert_eq!(d == 0.0, salient_diff_is_zero);
    }

    #[test]
    fn equilibrium_is_a_distribution(
        (weights, utilities) in weighted_utilities(),
        rule in voting_rule(),
        victory in victory_model(),
        pce in pce_model(),
    ) {
        let p = scalar_pce(&weights, &utilities, rule, victory, pce).unwrap();
        prop_assert_eq!(p.len(), utilities.ncols());
        prop_assert!((p.sum() - 1.0).abs() < PROBABILITY_TOLERANCE);
        prop_assert!(p.iter().all(|x| (0.0..=1.0).contains(x)));
    }
}
