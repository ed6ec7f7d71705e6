//! Smoothed Gaussian likelihood field shared by the correspondence strategies.
//!
//! Flooring is done in the log domain: `max(exponent, ln(smoothing))` equals
//! `ln(max(exp(exponent), smoothing))` without underflowing `exp` for far
//! points.

use nalgebra::Vector3;

use crate::cloud::Point;
use crate::evaluator::ScoringParams;

/// Highest log-likelihood of `query` over `candidates`, or `-inf` if there
/// are none.
#[inline]
pub fn best_exponent<'a, I>(params: &ScoringParams, candidates: I, query: &Vector3<f64>) -> f64
where
    I: IntoIterator<Item = &'a Vector3<f64>>,
{
    candidates
        .into_iter()
        .map(|c| {
            let dx = query.x - c.x;
            let dy = query.y - c.y;
            let dz = query.z - c.z;
            params.exponent(dx * dx + dy * dy, dz * dz)
        })
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Same as [`best_exponent`] over the positions of a point slice.
#[inline]
pub fn best_exponent_points(params: &ScoringParams, candidates: &[Point], query: &Vector3<f64>) -> f64 {
    candidates
        .iter()
        .map(|c| {
            let dx = query.x - c.x;
            let dy = query.y - c.y;
            let dz = query.z - c.z;
            params.exponent(dx * dx + dy * dy, dz * dz)
        })
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Per-point log-probability floored at the smoothing factor.
///
/// Non-finite residuals (NaN points) count as unmatched and land on the floor.
#[inline]
pub fn point_log_probability(params: &ScoringParams, best_exponent: f64) -> f64 {
    best_exponent.max(params.log_smoothing_factor())
}

/// Discounted aggregate of `num_points` per-point log-probabilities summing to
/// `sum`. An empty cloud carries no information and scores the floor.
#[inline]
pub fn aggregate_log_probability(params: &ScoringParams, num_points: usize, sum: f64) -> f64 {
    if num_points == 0 {
        params.log_smoothing_factor()
    } else {
        params.discount_factor() * sum
    }
}
