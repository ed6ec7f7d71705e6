use nalgebra::Vector3;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use super::likelihood::{aggregate_log_probability, best_exponent, point_log_probability};
use crate::cloud::{Point, PointCloud};
use crate::error::ScoringError;
use crate::evaluator::{LogProbabilityScorer, ScoringContext, ScoringParams};

type CellKey = (i64, i64, i64);

/// Hash grid over the previous cloud, built once per registration.
#[derive(Debug)]
struct VoxelIndex {
    cloud: Arc<PointCloud>,
    cells: HashMap<CellKey, Vec<Vector3<f64>>>,
    num_points: usize,
}

/// Grid-accelerated correspondence search.
///
/// Only cells inside the box beyond which every likelihood is already below
/// the smoothing floor are visited, so the result equals the exhaustive
/// search. When that box spans more cells than are occupied the scorer scans
/// all occupied cells instead.
#[derive(Debug)]
pub struct VoxelGridScorer {
    voxel_size: f64,
    parallel_points: bool,
    index: Option<VoxelIndex>,
}

impl VoxelGridScorer {
    /// `voxel_size` must be finite and positive; invalid sizes fall back to 0.1 m.
    pub fn new(voxel_size: f64) -> Self {
        let voxel_size = if voxel_size.is_finite() && voxel_size > 0.0 {
            voxel_size
        } else {
            tracing::warn!(voxel_size, "Invalid voxel size, using 0.1");
            0.1
        };
        Self {
            voxel_size,
            parallel_points: false,
            index: None,
        }
    }

    pub fn with_parallel_points(mut self, parallel_points: bool) -> Self {
        self.parallel_points = parallel_points;
        self
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    /// Number of occupied cells, or `None` before the first registration.
    pub fn occupied_cells(&self) -> Option<usize> {
        self.index.as_ref().map(|index| index.cells.len())
    }

    fn cell_of(&self, x: f64, y: f64, z: f64) -> CellKey {
        (
            (x / self.voxel_size).floor() as i64,
            (y / self.voxel_size).floor() as i64,
            (z / self.voxel_size).floor() as i64,
        )
    }

    fn cell_range(&self, center: f64, radius: f64) -> std::ops::RangeInclusive<i64> {
        let lo = ((center - radius) / self.voxel_size).floor() as i64;
        let hi = ((center + radius) / self.voxel_size).floor() as i64;
        lo..=hi
    }

    fn best_in_box(
        &self,
        index: &VoxelIndex,
        params: &ScoringParams,
        query: &Vector3<f64>,
        (rxy, rz): (f64, f64),
    ) -> f64 {
        let mut best = f64::NEG_INFINITY;
        for ix in self.cell_range(query.x, rxy) {
            for iy in self.cell_range(query.y, rxy) {
                for iz in self.cell_range(query.z, rz) {
                    if let Some(cell) = index.cells.get(&(ix, iy, iz)) {
                        best = best.max(best_exponent(params, cell, query));
                    }
                }
            }
        }
        best
    }
}

impl LogProbabilityScorer for VoxelGridScorer {
    fn name(&self) -> &str {
        "voxel_grid"
    }

    fn prepare(&mut self, prev_points: &Arc<PointCloud>) {
        let mut cells: HashMap<CellKey, Vec<Vector3<f64>>> = HashMap::new();
        let mut num_points = 0;
        for point in prev_points.iter().filter(|p| p.is_finite()) {
            cells
                .entry(self.cell_of(point.x, point.y, point.z))
                .or_default()
                .push(point.position());
            num_points += 1;
        }

        tracing::debug!(
            points = num_points,
            skipped = prev_points.len() - num_points,
            cells = cells.len(),
            voxel_size = self.voxel_size,
            "Voxel index built"
        );

        self.index = Some(VoxelIndex {
            cloud: Arc::clone(prev_points),
            cells,
            num_points,
        });
    }

    fn log_probability(
        &self,
        ctx: &ScoringContext<'_>,
        offset: &Vector3<f64>,
    ) -> Result<f64, ScoringError> {
        let index = match &self.index {
            Some(index) if std::ptr::eq(Arc::as_ptr(&index.cloud), ctx.prev_points) => index,
            _ => {
                return Err(ScoringError::StaleIndex {
                    scorer: self.name().to_string(),
                })
            }
        };

        let params = ctx.params;
        let radius = params.floor_radius();
        let cells_per_xy = (2.0 * radius.0 / self.voxel_size).ceil() + 1.0;
        let cells_per_z = (2.0 * radius.1 / self.voxel_size).ceil() + 1.0;
        let box_cells = cells_per_xy * cells_per_xy * cells_per_z;
        let scan_all = !box_cells.is_finite() || box_cells > index.cells.len() as f64;

        let per_point = |p: &Point| {
            let query = p.position() + offset;
            let best = if index.num_points == 0 {
                f64::NEG_INFINITY
            } else if scan_all || !p.is_finite() {
                index
                    .cells
                    .values()
                    .map(|cell| best_exponent(params, cell, &query))
                    .fold(f64::NEG_INFINITY, f64::max)
            } else {
                self.best_in_box(index, params, &query, radius)
            };
            point_log_probability(params, best)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_skips_non_finite_points() {
        let cloud = Arc::new(PointCloud::from_positions(vec![
            (0.0, 0.0, 0.0),
            (0.05, 0.05, 0.05),
            (1.0, 0.0, 0.0),
            (f64::NAN, 0.0, 0.0),
        ]));
        let mut scorer = VoxelGridScorer::new(0.1);
        assert!(scorer.occupied_cells().is_none());

        scorer.prepare(&cloud);
        assert_eq!(scorer.occupied_cells(), Some(2));
    }

    #[test]
    fn test_invalid_voxel_size_falls_back() {
        assert_eq!(VoxelGridScorer::new(0.0).voxel_size(), 0.1);
        assert_eq!(VoxelGridScorer::new(0.25).voxel_size(), 0.25);
    }

    #[test]
    fn test_cell_range_covers_radius() {
        let scorer = VoxelGridScorer::new(0.1);
        let range = scorer.cell_range(0.05, 0.12);
        assert_eq!(*range.start(), -1);
        assert_eq!(*range.end(), 1);
    }
}
