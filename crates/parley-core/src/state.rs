//! Simulation states and their derived utility data.
//!
//! A [`State`] is one snapshot of the negotiation: a position per actor,
//! indexed like the model's roster. Once appended to the history its
//! positions never change. The derived [`StateUtilities`] (distances,
//! inferred risk attitudes, per-perspective utility estimates) are absent
//! on a fresh state and are filled in exactly once, before the state is
//! stepped.
//!
//! Risk attitudes are inferred rather than assumed. A risk-neutral pass
//! computes the coalition equilibrium over actors' positions; actors whose
//! positions are likely to prevail are taken to be risk-averse, actors whose
//! positions are unlikely to prevail risk-seeking.

// Matrix and vector indices below are bounded by the actor count, which is
// fixed by the positions vector and checked against the roster on entry.
#![allow(clippy::indexing_slicing)]

use nalgebra::{DMatrix, DVector};
use parley_model::{bargain_utility, risk_weighted_utility, scalar_pce, weighted_distance};
use parley_types::{Actor, Perspective, Position, RiskAdjust, RiskRange};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::BargainingConfig;
use crate::error::{EngineError, InvariantViolation};

/// Risk-neutral and risk-aware utility matrices closer than this (Frobenius
/// norm) are flagged as a degenerate risk inference.
pub const RISK_DEGENERACY_TOLERANCE: f64 = 1e-6;

/// Equilibrium probabilities spread narrower than this give every actor a
/// neutral risk attitude.
const PROBABILITY_SPREAD_FLOOR: f64 = 1e-10;

/// Derived data of a state, computed from its positions and the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUtilities {
    /// `diff[(i, j)]`: distance from `i`'s position to `j`'s, weighted by
    /// `i`'s salience.
    pub diff: DMatrix<f64>,
    /// Inferred risk attitude of each actor.
    pub nra: DVector<f64>,
    /// `a_util[h][(i, j)]`: `h`'s estimate of `i`'s utility for `j`'s
    /// position.
    pub a_util: Vec<DMatrix<f64>>,
    /// Set when the risk-aware utilities are indistinguishable from the
    /// risk-neutral ones.
    pub degenerate_risk: bool,
}

impl StateUtilities {
    /// Run the two-pass risk inference and build every perspective's
    /// utility matrix.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::Model`] on a salience or distance
    /// defect, or if the risk-neutral equilibrium is not a distribution.
    pub fn compute(
        positions: &[Position],
        actors: &[Actor],
        config: &BargainingConfig,
    ) -> Result<Self, InvariantViolation> {
        let n = actors.len();
        let weights = capability_weights(actors);

        let mut diff = DMatrix::zeros(n, n);
        for (i, (actor, own)) in actors.iter().zip(positions).enumerate() {
            for (j, other) in positions.iter().enumerate() {
                diff[(i, j)] = weighted_distance(&own.difference(other), &actor.salience)?;
            }
        }

        // Risk-neutral pass.
        let neutral = diff.map(|d| risk_weighted_utility(d, 0.0));
        let probabilities = scalar_pce(
            &weights,
            &neutral,
            config.voting_rule,
            config.victory_model,
            config.pce_model,
        )?;
        let nra = big_r_from_prob(&probabilities, config.risk_range);

        // Risk-aware pass.
        let aware = DMatrix::from_fn(n, n, |i, j| risk_weighted_utility(diff[(i, j)], nra[i]));
        let separation = (&neutral - &aware).norm();
        let degenerate_risk = separation <= RISK_DEGENERACY_TOLERANCE;
        if degenerate_risk {
            warn!(
                actors = n,
                separation, "Risk-aware utilities indistinguishable from risk-neutral"
            );
        }

        let a_util = (0..n)
            .into_par_iter()
            .map(|h| {
                DMatrix::from_fn(n, n, |i, j| {
                    let r = estimated_risk(config.risk_adjust, nra[h], nra[i]);
                    risk_weighted_utility(diff[(i, j)], r)
                })
            })
            .collect();

        debug!(actors = n, nra = ?nra.as_slice(), "State utilities computed");

        Ok(Self {
            diff,
            nra,
            a_util,
            degenerate_risk,
        })
    }

    /// Utility matrix estimated by perspective holder `h`.
    pub fn perspective(&self, h: usize) -> Option<&DMatrix<f64>> {
        self.a_util.get(h)
    }
}

/// One snapshot of every actor's position.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    index: usize,
    positions: Vec<Position>,
    utilities: Option<StateUtilities>,
}

impl State {
    /// The first state of a run.
    pub const fn initial(positions: Vec<Position>) -> Self {
        Self {
            index: 0,
            positions,
            utilities: None,
        }
    }

    /// A fresh state following `previous`, without derived data.
    pub const fn successor(previous: &Self, positions: Vec<Position>) -> Self {
        Self {
            index: previous.index.saturating_add(1),
            positions,
            utilities: None,
        }
    }

    /// Index of this state in its model's history.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Every actor's position, by actor index.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Number of actors in the state.
    pub fn actor_count(&self) -> usize {
        self.positions.len()
    }

    /// An owned copy of every actor's position.
    pub fn positions_snapshot(&self) -> Vec<Position> {
        self.positions.clone()
    }

    /// Derived data, if it has been computed.
    pub const fn utilities(&self) -> Option<&StateUtilities> {
        self.utilities.as_ref()
    }

    /// Derived data, or [`InvariantViolation::UtilitiesMissing`].
    ///
    /// # Errors
    ///
    /// Fails if [`State::ensure_utilities`] has not been called.
    pub fn require_utilities(&self) -> Result<&StateUtilities, InvariantViolation> {
        self.utilities
            .as_ref()
            .ok_or(InvariantViolation::UtilitiesMissing)
    }

    /// Compute the derived data unless it is already present.
    ///
    /// # Errors
    ///
    /// See [`StateUtilities::compute`].
    pub fn ensure_utilities(
        &mut self,
        actors: &[Actor],
        config: &BargainingConfig,
    ) -> Result<&StateUtilities, InvariantViolation> {
        if self.utilities.is_none() {
            self.utilities = Some(StateUtilities::compute(&self.positions, actors, config)?);
        }
        self.require_utilities()
    }

    /// Utility actor `voter` assigns to `position`, judged from the voter's
    /// own position with its own salience and inferred risk attitude.
    ///
    /// # Errors
    ///
    /// Fails if derived data is missing or the distance is undefined.
    pub fn position_utility(
        &self,
        actors: &[Actor],
        voter: usize,
        position: &Position,
    ) -> Result<f64, InvariantViolation> {
        let utilities = self.require_utilities()?;
        let own = &self.positions[voter];
        let actor = &actors[voter];
        let u = bargain_utility(&own.difference(position), &actor.salience, utilities.nra[voter])?;
        Ok(u)
    }

    /// Probability distribution over actors' current positions.
    ///
    /// With [`Perspective::Actor`]`(h)` every utility is `h`'s estimate;
    /// with [`Perspective::Own`] each actor's row is its own estimate.
    /// Derived data is computed on the fly (and not kept) if absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PerspectiveOutOfRange`] for an unknown actor,
    /// or [`EngineError::Invariant`] if the equilibrium fails.
    pub fn probability_distribution(
        &self,
        perspective: Perspective,
        actors: &[Actor],
        config: &BargainingConfig,
    ) -> Result<DVector<f64>, EngineError> {
        let n = self.actor_count();
        if let Perspective::Actor(index) = perspective
            && index >= n
        {
            return Err(EngineError::PerspectiveOutOfRange { index, actors: n });
        }

        let at_state = |source| EngineError::invariant(self.index, source);
        let computed;
        let utilities = match &self.utilities {
            Some(utilities) => utilities,
            None => {
                computed = StateUtilities::compute(&self.positions, actors, config).map_err(at_state)?;
                &computed
            }
        };

        let u = match perspective {
            Perspective::Actor(h) => utilities.a_util[h].clone(),
            Perspective::Own => DMatrix::from_fn(n, n, |i, j| utilities.a_util[i][(i, j)]),
        };
        scalar_pce(
            &capability_weights(actors),
            &u,
            config.voting_rule,
            config.victory_model,
            config.pce_model,
        )
        .map_err(|source| at_state(source.into()))
    }
}

/// Capability of every actor, as a weight vector.
pub fn capability_weights(actors: &[Actor]) -> DVector<f64> {
    DVector::from_iterator(actors.len(), actors.iter().map(|a| a.capability))
}

/// Map equilibrium probabilities linearly onto risk attitudes.
///
/// The most likely actor gets `+1`; the least likely gets `0`, `-1/2` or
/// `-1` for [`RiskRange::Min`], [`RiskRange::Mid`] and [`RiskRange::Max`].
/// If every probability is (nearly) equal, every actor is risk neutral.
pub fn big_r_from_prob(p: &DVector<f64>, range: RiskRange) -> DVector<f64> {
    let p_min = p.min();
    let p_max = p.max();
    let spread = p_max - p_min;
    if spread < PROBABILITY_SPREAD_FLOOR {
        warn!(
            actors = p.len(),
            spread, "Equilibrium probabilities are flat; assuming risk-neutral actors"
        );
        return DVector::zeros(p.len());
    }

    p.map(|x| match range {
        RiskRange::Min => (x - p_min) / spread,
        RiskRange::Mid => (3.0f64.mul_add(x, -(p_max + 2.0 * p_min))) / (2.0 * spread),
        RiskRange::Max => (2.0f64.mul_add(x, -(p_max + p_min))) / spread,
    })
}

/// Risk attitude that holder `h` attributes to actor `i`.
fn estimated_risk(adjust: RiskAdjust, r_h: f64, r_i: f64) -> f64 {
    match adjust {
        RiskAdjust::Full => r_i,
        RiskAdjust::Half => f64::midpoint(r_h, r_i),
        RiskAdjust::Own => r_h,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line_actors() -> (Vec<Actor>, Vec<Position>) {
        let actors = (0..3)
            .map(|i| Actor::new(format!("A{i}"), "", 50.0, vec![1.0]))
            .collect();
        let positions = vec![
            Position::new(vec![0.0]),
            Position::new(vec![0.5]),
            Position::new(vec![1.0]),
        ];
        (actors, positions)
    }

    #[test]
    fn risk_ranges_span_expected_intervals() {
        let p = DVector::from_vec(vec![0.2, 0.5, 0.3]);
        let min = big_r_from_prob(&p, RiskRange::Min);
        let mid = big_r_from_prob(&p, RiskRange::Mid);
        let max = big_r_from_prob(&p, RiskRange::Max);
        assert!((min[0] - 0.0).abs() < 1e-12 && (min[1] - 1.0).abs() < 1e-12);
        assert!((mid[0] + 0.5).abs() < 1e-12 && (mid[1] - 1.0).abs() < 1e-12);
        assert!((max[0] + 1.0).abs() < 1e-12 && (max[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn flat_probabilities_mean_neutral_risk() {
        let p = DVector::from_element(4, 0.25);
        assert!(big_r_from_prob(&p, RiskRange::Max).iter().all(|r| r.abs() < 1e-15));
    }

    #[test]
    fn fresh_state_has_no_utilities() {
        let (_, positions) = line_actors();
        let state = State::initial(positions);
        assert!(state.utilities().is_none());
        assert_eq!(
            state.require_utilities().unwrap_err(),
            InvariantViolation::UtilitiesMissing
        );
    }

    #[test]
    fn utilities_have_expected_shape_and_diagonal() {
        let (actors, positions) = line_actors();
        let mut state = State::initial(positions);
        let u = state.ensure_utilities(&actors, &BargainingConfig::default()).unwrap();
        assert_eq!(u.diff.shape(), (3, 3));
        assert_eq!(u.a_util.len(), 3);
        assert!((u.diff[(0, 2)] - 1.0).abs() < 1e-12);
        for h in 0..3 {
            for i in 0..3 {
                assert!((u.a_util[h][(i, i)] - 1.0).abs() < 1e-12);
            }
        }
        // The central actor is most likely to prevail, so the most risk-averse.
        assert!(u.nra[1] > u.nra[0]);
        assert!((u.nra[1] - 1.0).abs() < 1e-12);
        assert!(!u.degenerate_risk);
    }

    #[test]
    fn identical_positions_flag_degenerate_risk() {
        let (actors, _) = line_actors();
        let mut state = State::initial(vec![Position::new(vec![0.4]); 3]);
        let u = state.ensure_utilities(&actors, &BargainingConfig::default()).unwrap();
        assert!(u.degenerate_risk);
    }

    #[test]
    fn successor_is_fresh_and_indexed() {
        let (actors, positions) = line_actors();
        let mut first = State::initial(positions.clone());
        first.ensure_utilities(&actors, &BargainingConfig::default()).unwrap();
        let second = State::successor(&first, positions);
        assert_eq!(second.index(), 1);
        assert!(second.utilities().is_none());
    }

    #[test]
    fn probability_distribution_by_perspective() {
        let (actors, positions) = line_actors();
        let config = BargainingConfig::default();
        let state = State::initial(positions);
        for perspective in [Perspective::Actor(0), Perspective::Actor(2)] {
            let p = state.probability_distribution(perspective, &actors, &config).unwrap();
            assert!((p.sum() - 1.0).abs() < 1e-8);
            assert!(p[1] > p[0]);
        }
        // Each actor's own risk attitude exactly offsets the centre's edge.
        let own = state.probability_distribution(Perspective::Own, &actors, &config).unwrap();
        assert!(own.iter().all(|p| (p - 1.0 / 3.0).abs() < 1e-9));
        assert!(matches!(
            state.probability_distribution(Perspective::Actor(3), &actors, &config),
            Err(EngineError::PerspectiveOutOfRange { index: 3, actors: 3 })
        ));
    }

    #[test]
    fn position_utility_uses_own_position() {
        let (actors, positions) = line_actors();
        let mut state = State::initial(positions);
        state.ensure_utilities(&actors, &BargainingConfig::default()).unwrap();
        let own = state.position_utility(&actors, 0, &Position::new(vec![0.0])).unwrap();
        let far = state.position_utility(&actors, 0, &Position::new(vec![1.0])).unwrap();
        assert!((own - 1.0).abs() < 1e-12);
        assert!(far.abs() < 1e-12);
    }
}
