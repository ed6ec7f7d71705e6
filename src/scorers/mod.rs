pub mod likelihood;
pub mod nearest_neighbor;
pub mod voxel_grid;

pub use likelihood::*;
pub use nearest_neighbor::*;
pub use voxel_grid::*;

use crate::config::{EvaluationConfig, ScorerKind};
use crate::evaluator::LogProbabilityScorer;

/// Construct the correspondence strategy selected in the configuration.
pub fn build_scorer(config: &EvaluationConfig) -> Box<dyn LogProbabilityScorer> {
    match config.scorer {
        ScorerKind::NearestNeighbor => Box::new(NearestNeighborScorer::new()),
        ScorerKind::VoxelGrid => Box::new(VoxelGridScorer::new(config.voxel_size)),
    }
}
