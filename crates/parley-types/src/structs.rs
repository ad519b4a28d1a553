//! Core entity structs: [`Actor`] and [`Position`].
//!
//! Actors are immutable once a model is constructed; their index in the
//! model's roster is their identity throughout the engine. Positions are
//! plain value vectors owned by exactly one state.

use serde::{Deserialize, Serialize};

use crate::enums::VotingRule;

/// A negotiating party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Short display name.
    pub name: String,
    /// Longer free-text description.
    pub description: String,
    /// Scalar capability (non-negative, unbounded scale).
    pub capability: f64,
    /// Per-dimension attention weights, each in `[0, 1]`, summing to at
    /// most 1.
    pub salience: Vec<f64>,
    /// How this actor converts utility differences into votes.
    #[serde(default)]
    pub voting_rule: VotingRule,
}

impl Actor {
    /// Create an actor with the default voting rule.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        capability: f64,
        salience: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            capability,
            salience,
            voting_rule: VotingRule::default(),
        }
    }

    /// Total attention this actor pays across all dimensions.
    pub fn total_salience(&self) -> f64 {
        self.salience.iter().sum()
    }

    /// Influence the actor can bring to bear on a contest: capability
    /// scaled by total salience.
    pub fn influence(&self) -> f64 {
        self.capability * self.total_salience()
    }
}

/// A point in the policy space, one value per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(Vec<f64>);

impl Position {
    /// Wrap a coordinate vector.
    pub const fn new(coords: Vec<f64>) -> Self {
        Self(coords)
    }

    /// The coordinates, one per dimension.
    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Component-wise difference `self - other`.
    ///
    /// Dimensions beyond the shorter of the two positions are ignored.
    pub fn difference(&self, other: &Self) -> Vec<f64> {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| a - b)
            .collect()
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Consume the position, returning its coordinates.
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for Position {
    fn from(coords: Vec<f64>) -> Self {
        Self(coords)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn influence_scales_capability_by_total_salience() {
        let actor = Actor::new("A", "test", 50.0, vec![0.25, 0.5]);
        assert!((actor.total_salience() - 0.75).abs() < 1e-12);
        assert!((actor.influence() - 37.5).abs() < 1e-12);
        assert_eq!(actor.voting_rule, VotingRule::Proportional);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(vec![0.0, 0.0]);
        let b = Position::new(vec![0.3, 0.4]);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
        assert_eq!(b.difference(&a), vec![0.3, 0.4]);
    }

    #[test]
    fn position_serializes_as_plain_array() {
        let p = Position::new(vec![0.5, 1.0]);
        assert_eq!(serde_json::to_string(&p).unwrap(), "[0.5,1.0]");
    }

    #[test]
    fn voting_rule_defaults_when_absent() {
        let json = r#"{"name":"A","description":"","capability":1.0,"salience":[1.0]}"#;
        let actor: Actor = serde_json::from_str(json).unwrap();
        assert_eq!(actor.voting_rule, VotingRule::Proportional);
    }
}
