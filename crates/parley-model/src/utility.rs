//! Risk-weighted utility over salience-weighted policy distance.
//!
//! An actor's utility for a position depends on how far that position is
//! from its own, measured with the actor's own salience weights, and on the
//! actor's risk attitude `r`:
//!
//! ```text
//! u(d, r) = (1 - d) * (1 + d * r)        for 0 <= d <= 1
//! u(d, r) = -(r + 1) * (d - 1)           for d > 1
//! ```
//!
//! The second branch extends the curve linearly with its slope at `d = 1`,
//! so the function stays continuous and differentiable when searches stray
//! outside the unit cube. Positive `r` is risk-averse (concave), negative
//! `r` risk-seeking (convex), zero risk-neutral (linear).

use crate::error::ModelError;

/// Utility of a normalized distance `d` under risk attitude `r`.
///
/// Returns 1 at `d = 0` and 0 at `d = 1` for every `r`, and lies in
/// `[0, 1]` on `0 <= d <= 1` whenever `-1 <= r <= 1`. Negative distances are
/// treated as zero.
pub fn risk_weighted_utility(d: f64, r: f64) -> f64 {
    let d = d.max(0.0);
    if d <= 1.0 {
        (1.0 - d) * d.mul_add(r, 1.0)
    } else {
        -(r + 1.0) * (d - 1.0)
    }
}

/// Salience-weighted root-mean-square distance:
/// `sqrt(sum((diff_k * s_k)^2) / sum(s_k^2))`.
///
/// The weights are rescaled by their maximum before squaring, which leaves
/// the ratio unchanged but keeps tiny saliences from underflowing.
///
/// # Errors
///
/// - [`ModelError::DimensionMismatch`] if the slices differ in length.
/// - [`ModelError::NegativeSalience`] if any weight is negative or NaN.
/// - [`ModelError::ZeroSalience`] if every weight is zero.
/// - [`ModelError::NonFiniteDistance`] if the result is NaN or infinite.
pub fn weighted_distance(diff: &[f64], salience: &[f64]) -> Result<f64, ModelError> {
    if diff.len() != salience.len() {
        return Err(ModelError::DimensionMismatch {
            expected: salience.len(),
            actual: diff.len(),
        });
    }

    let mut max_salience = 0.0_f64;
    for (dimension, &value) in salience.iter().enumerate() {
        if value.is_nan() || value < 0.0 {
            return Err(ModelError::NegativeSalience { dimension, value });
        }
        max_salience = max_salience.max(value);
    }
    if max_salience <= 0.0 {
        return Err(ModelError::ZeroSalience);
    }

    let (weighted, total) = diff
        .iter()
        .zip(salience)
        .fold((0.0_f64, 0.0_f64), |(weighted, total), (&d, &s)| {
            let scaled = s / max_salience;
            let ds = d * scaled;
            (ds.mul_add(ds, weighted), scaled.mul_add(scaled, total))
        });

    let distance = (weighted / total).sqrt();
    if distance.is_finite() {
        Ok(distance)
    } else {
        Err(ModelError::NonFiniteDistance { value: distance })
    }
}

/// Utility of a position difference for an actor with the given salience
/// weights and risk attitude.
pub fn bargain_utility(diff: &[f64], salience: &[f64], r: f64) -> Result<f64, ModelError> {
    weighted_distance(diff, salience).map(|d| risk_weighted_utility(d, r))
}
