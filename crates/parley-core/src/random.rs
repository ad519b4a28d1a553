//! Random scenario generation.
//!
//! The generator is passed in by the caller; the same seed always yields
//! the same scenario.

use parley_types::VotingRule;
use rand::Rng;

use crate::scenario::{ActorRecord, PERCENT, Scenario};

/// Generate a scenario with `actors` actors over `dimensions` dimensions.
///
/// Each actor draws a capability from `U(10, 200)`, a total salience from
/// `U(0.75, 0.99)` split across dimensions in proportion to `U(0.1, 1)`
/// draws, and a position uniformly in the unit cube. Values are stored on
/// the percent scale like any loaded scenario.
pub fn random_scenario(actors: usize, dimensions: usize, rng: &mut impl Rng) -> Scenario {
    let records = (0..actors)
        .map(|i| {
            let capability = rng.random_range(10.0..200.0);
            let total = rng.random_range(0.75..0.99);
            let shares: Vec<f64> = (0..dimensions).map(|_| rng.random_range(0.1..1.0)).collect();
            let share_sum: f64 = shares.iter().sum();
            let saliences = shares
                .iter()
                .map(|s| PERCENT * total * s / share_sum)
                .collect();
            let positions = (0..dimensions)
                .map(|_| PERCENT * rng.random_range(0.0..1.0))
                .collect();
            ActorRecord {
                name: format!("SActor-{i:02}"),
                description: "Random spatial actor".to_owned(),
                capability,
                positions,
                saliences,
                voting_rule: VotingRule::Proportional,
            }
        })
        .collect();

    Scenario {
        name: format!("Random {actors}x{dimensions}"),
        description: String::new(),
        dimensions: (0..dimensions).map(|k| format!("Dim-{k:02}")).collect(),
        actors: records,
    }
}
