use nalgebra::Vector3;
use std::sync::Arc;

use super::params::ScoringParams;
use crate::cloud::PointCloud;
use crate::error::ScoringError;
use crate::motion::MotionPrior;

/// Everything a correspondence strategy may read while scoring one batch.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    pub prev_points: &'a PointCloud,
    pub current_points: &'a PointCloud,
    pub current_points_centroid: &'a Vector3<f64>,
    pub motion_model: &'a dyn MotionPrior,
    pub params: &'a ScoringParams,
}

/// Per-transform measurement model: how well the current points, displaced by
/// `offset`, are explained by the previous points.
///
/// Implementations must
/// - score each displaced current point against its best corresponding
///   previous point with `params.exponent(..)`,
/// - floor every per-point probability at `params.smoothing_factor()`,
/// - multiply the summed log-probabilities by `params.discount_factor()`,
/// - return a finite value.
///
/// [`crate::scorers::aggregate_log_probability`] implements the last three
/// steps for strategies that only supply the correspondence search.
pub trait LogProbabilityScorer: Send + Sync {
    /// Returns the name of the strategy
    fn name(&self) -> &str;

    /// Called whenever a new previous cloud is registered, so strategies can
    /// build search structures once instead of per transform.
    fn prepare(&mut self, _prev_points: &Arc<PointCloud>) {}

    /// Log-likelihood of the current points displaced by `offset`
    fn log_probability(
        &self,
        ctx: &ScoringContext<'_>,
        offset: &Vector3<f64>,
    ) -> Result<f64, ScoringError>;
}
