//! Bargains: compromise positions proposed between two actors.
//!
//! A bargain lives for one step only. The step keeps every bargain in a
//! single arena and refers to it by index from each party's candidate list,
//! so a bargain listed by both parties is still owned exactly once.

use parley_types::{Actor, InterpolationPolicy, Position};

/// Floor on the proposer's own interpolation weight.
pub const MIN_WEIGHT: f64 = 1e-6;

/// A proposed pair of positions for an initiator and a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Bargain {
    /// Actor that proposed the bargain.
    pub initiator: usize,
    /// Actor the bargain was proposed to.
    pub receiver: usize,
    /// Position the initiator would adopt.
    pub initiator_position: Position,
    /// Position the receiver would adopt.
    pub receiver_position: Position,
}

impl Bargain {
    /// The position this bargain assigns to `actor`, if it is a party.
    pub fn position_for(&self, actor: usize) -> Option<&Position> {
        if actor == self.initiator {
            Some(&self.initiator_position)
        } else if actor == self.receiver {
            Some(&self.receiver_position)
        } else {
            None
        }
    }
}

/// One entry in an actor's candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Keep the current position.
    StatusQuo,
    /// Adopt this actor's side of the bargain at the given arena index.
    Bargain(usize),
}

/// Compromise positions for actors `i` and `j`, dimension by dimension.
///
/// `prob_i` and `prob_j` are each side's probability of prevailing in a
/// contest between them.
pub fn interpolate(
    actor_i: &Actor,
    actor_j: &Actor,
    pos_i: &Position,
    pos_j: &Position,
    (prob_i, prob_j): (f64, f64),
    policy: InterpolationPolicy,
) -> (Position, Position) {
    let (b_i, b_j): (Vec<f64>, Vec<f64>) = pos_i
        .coords()
        .iter()
        .zip(pos_j.coords())
        .zip(actor_i.salience.iter().zip(&actor_j.salience))
        .map(|((&t_i, &t_j), (&s_i, &s_j))| {
            let side_i = Side {
                position: t_i,
                salience: s_i,
                probability: prob_i,
            };
            let side_j = Side {
                position: t_j,
                salience: s_j,
                probability: prob_j,
            };
            match policy {
                InterpolationPolicy::S1P1 => power_weighted(1, side_i, side_j),
                InterpolationPolicy::S2P2 => power_weighted(2, side_i, side_j),
                InterpolationPolicy::S2PMax => margin_driven(side_i, side_j),
            }
        })
        .unzip();
    (Position::new(b_i), Position::new(b_j))
}

/// One party's stake on a single dimension.
#[derive(Debug, Clone, Copy)]
struct Side {
    position: f64,
    salience: f64,
    probability: f64,
}

/// Weighted average with weights `salience^n * probability^n`, the proposer
/// keeping a small floor weight on its own position.
fn power_weighted(n: i32, i: Side, j: Side) -> (f64, f64) {
    let w_i = i.salience.powi(n) * i.probability.powi(n);
    let w_j = j.salience.powi(n) * j.probability.powi(n);
    let total = w_i + MIN_WEIGHT + w_j;
    let b_i = (w_i + MIN_WEIGHT).mul_add(i.position, w_j * j.position) / total;
    let b_j = w_i.mul_add(i.position, (MIN_WEIGHT + w_j) * j.position) / total;
    (b_i, b_j)
}

/// Each side moves toward the other by the margin the other's probability
/// exceeds its own, scaled by relative squared salience.
fn margin_driven(i: Side, j: Side) -> (f64, f64) {
    let d_i = (j.probability - i.probability).max(0.0);
    let d_j = (i.probability - j.probability).max(0.0);
    let s_i2 = i.salience * i.salience;
    let s_j2 = j.salience * j.salience;

    let delta_i = (d_i * s_j2) / (1.0 - d_i).mul_add(s_i2, d_i.mul_add(s_j2, MIN_WEIGHT));
    let delta_j = (d_j * s_i2) / (1.0 - d_j).mul_add(s_j2, d_j.mul_add(s_i2, MIN_WEIGHT));

    let b_i = delta_i.mul_add(j.position - i.position, i.position);
    let b_j = delta_j.mul_add(i.position - j.position, j.position);
    (b_i, b_j)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(salience: Vec<f64>) -> Actor {
        Actor::new("A", "", 10.0, salience)
    }

    #[test]
    fn uncaring_powerless_actors_stay_put() {
        let a = actor(vec![0.0, 0.5]);
        let b = actor(vec![0.0, 0.5]);
        let pa = Position::new(vec![0.1, 0.2]);
        let pb = Position::new(vec![0.9, 0.8]);
        for policy in [InterpolationPolicy::S1P1, InterpolationPolicy::S2P2] {
            let (bi, bj) = interpolate(&a, &b, &pa, &pb, (0.0, 0.0), policy);
            assert!((bi.coords()[0] - 0.1).abs() < 1e-15, "{policy}");
            assert!((bj.coords()[0] - 0.9).abs() < 1e-15, "{policy}");
        }
    }

    #[test]
    fn equal_stakes_meet_near_the_middle() {
        let a = actor(vec![0.5]);
        let b = actor(vec![0.5]);
        let (bi, bj) = interpolate(
            &a,
            &b,
            &Position::new(vec![0.0]),
            &Position::new(vec![1.0]),
            (0.5, 0.5),
            InterpolationPolicy::S1P1,
        );
        assert!((bi.coords()[0] - 0.5).abs() < 1e-5);
        assert!((bj.coords()[0] - 0.5).abs() < 1e-5);
        // The proposer's floor pulls each side slightly toward itself.
        assert!(bi.coords()[0] < bj.coords()[0]);
    }

    #[test]
    fn stronger_side_moves_less() {
        let a = actor(vec![0.8]);
        let b = actor(vec![0.8]);
        let (bi, bj) = interpolate(
            &a,
            &b,
            &Position::new(vec![0.0]),
            &Position::new(vec![1.0]),
            (0.8, 0.2),
            InterpolationPolicy::S2P2,
        );
        assert!(bi.coords()[0] < 0.5);
        assert!(bj.coords()[0] < 0.5);
    }

    #[test]
    fn margin_policy_moves_only_the_weaker_side() {
        let a = actor(vec![1.0]);
        let b = actor(vec![1.0]);
        let (bi, bj) = interpolate(
            &a,
            &b,
            &Position::new(vec![0.2]),
            &Position::new(vec![0.6]),
            (0.7, 0.3),
            InterpolationPolicy::S2PMax,
        );
        // i is ahead, so it keeps its position.
        assert!((bi.coords()[0] - 0.2).abs() < 1e-15);
        // j concedes by the 0.4 margin: delta = 0.4 / (0.4 + 1e-6 + 0.6).
        let delta = 0.4 / (1.0 + MIN_WEIGHT);
        assert!((bj.coords()[0] - delta.mul_add(-0.4, 0.6)).abs() < 1e-12);
    }

    #[test]
    fn bargain_assigns_each_party_its_side() {
        let bargain = Bargain {
            initiator: 2,
            receiver: 5,
            initiator_position: Position::new(vec![0.3]),
            receiver_position: Position::new(vec![0.7]),
        };
        assert_eq!(bargain.position_for(2), Some(&Position::new(vec![0.3])));
        assert_eq!(bargain.position_for(5), Some(&Position::new(vec![0.7])));
        assert_eq!(bargain.position_for(1), None);
    }
}
