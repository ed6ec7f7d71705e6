use nalgebra::Vector3;
use rayon::prelude::*;

use super::likelihood::{aggregate_log_probability, best_exponent_points, point_log_probability};
use crate::cloud::Point;
use crate::error::ScoringError;
use crate::evaluator::{LogProbabilityScorer, ScoringContext};

/// Exhaustive correspondence search: every displaced current point is
/// compared against every previous point.
///
/// Quadratic in cloud size, but exact; the grid scorer is checked against it.
#[derive(Debug, Clone, Default)]
pub struct NearestNeighborScorer {
    parallel_points: bool,
}

impl NearestNeighborScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum per-point terms on the rayon pool instead of sequentially.
    pub fn with_parallel_points(mut self, parallel_points: bool) -> Self {
        self.parallel_points = parallel_points;
        self
    }
}

impl LogProbabilityScorer for NearestNeighborScorer {
    fn name(&self) -> &str {
        "nearest_neighbor"
    }

    fn log_probability(
        &self,
        ctx: &ScoringContext<'_>,
        offset: &Vector3<f64>,
    ) -> Result<f64, ScoringError> {
        let params = ctx.params;
        let prev = ctx.prev_points.points();
        let per_point = |p: &Point| {
            let query = p.position() + offset;
            point_log_probability(params, best_exponent_points(params, prev, &query))
        };

        let current = ctx.current_points.points();
        let sum: f64 = if self.parallel_points {
            current.par_iter().map(per_point).sum()
        } else {
            current.iter().map(per_point).sum()
        };

        Ok(aggregate_log_probability(params, current.len(), sum))
    }
}
