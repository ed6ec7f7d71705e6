use cloud_alignment::*;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn random_cloud(seed: u64, count: usize, extent: f64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Point::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent * 0.5..extent * 0.5),
            )
        })
        .collect()
}

fn score(
    scorer: &dyn LogProbabilityScorer,
    prev: &PointCloud,
    current: &PointCloud,
    params: &ScoringParams,
    offset: Vector3<f64>,
) -> std::result::Result<f64, ScoringError> {
    let centroid = current.centroid().unwrap_or_else(Vector3::zeros);
    let prior = UniformMotionPrior::default();
    let ctx = ScoringContext {
        prev_points: prev,
        current_points: current,
        current_points_centroid: &centroid,
        motion_model: &prior,
        params,
    };
    scorer.log_probability(&ctx, &offset)
}

fn offsets() -> Vec<Vector3<f64>> {
    vec![
        Vector3::zeros(),
        Vector3::new(0.03, -0.02, 0.01),
        Vector3::new(-0.12, 0.07, 0.0),
        Vector3::new(0.25, 0.25, -0.1),
        Vector3::new(1.5, 0.0, 0.0),
    ]
}

#[test]
fn test_voxel_grid_matches_exhaustive_search() {
    let prev = Arc::new(random_cloud(1, 300, 1.0));
    let current = random_cloud(2, 120, 1.0);

    let nn = NearestNeighborScorer::new();
    let mut grid = VoxelGridScorer::new(0.1);
    grid.prepare(&prev);

    for params in [
        ScoringParams::new(0.05, 0.05, 1e-4, 1.0).unwrap(),
        ScoringParams::new(0.08, 0.03, 1e-3, 0.5).unwrap(),
        ScoringParams::new(0.05, 0.05, 1e-4, 1.0).unwrap().anisotropic(),
    ] {
        for offset in offsets() {
            let exact = score(&nn, &prev, &current, &params, offset).unwrap();
            let fast = score(&grid, &prev, &current, &params, offset).unwrap();
            assert!(
                (exact - fast).abs() < 1e-9,
                "offset {:?}: exhaustive {} vs grid {}",
                offset,
                exact,
                fast
            );
        }
    }
}

#[test]
fn test_voxel_grid_matches_when_scanning_all_cells() {
    // A tiny floor pushes the search box past the number of occupied cells.
    let prev = Arc::new(random_cloud(3, 60, 0.5));
    let current = random_cloud(4, 40, 0.5);
    let params = ScoringParams::new(0.2, 0.2, 1e-200, 1.0).unwrap();

    let nn = NearestNeighborScorer::new();
    let mut grid = VoxelGridScorer::new(0.05);
    grid.prepare(&prev);

    for offset in offsets() {
        let exact = score(&nn, &prev, &current, &params, offset).unwrap();
        let fast = score(&grid, &prev, &current, &params, offset).unwrap();
        assert!((exact - fast).abs() < 1e-9);
    }
}

#[test]
fn test_voxel_grid_rejects_unregistered_cloud() {
    let registered = Arc::new(random_cloud(5, 20, 1.0));
    let other = random_cloud(5, 20, 1.0);
    let params = ScoringParams::new(0.1, 0.1, 1e-4, 1.0).unwrap();

    let unprepared = VoxelGridScorer::new(0.1);
    assert!(matches!(
        score(&unprepared, &other, &other, &params, Vector3::zeros()),
        Err(ScoringError::StaleIndex { .. })
    ));

    let mut grid = VoxelGridScorer::new(0.1);
    grid.prepare(&registered);
    assert!(matches!(
        score(&grid, &other, &other, &params, Vector3::zeros()),
        Err(ScoringError::StaleIndex { .. })
    ));
    assert!(score(&grid, &registered, &other, &params, Vector3::zeros()).is_ok());
}

#[test]
fn test_parallel_point_sums_agree() {
    let prev = Arc::new(random_cloud(6, 200, 1.0));
    let current = random_cloud(7, 500, 1.0);
    let params = ScoringParams::new(0.06, 0.04, 1e-4, 0.3).unwrap();
    let offset = Vector3::new(0.02, 0.01, -0.01);

    let nn_seq = score(&NearestNeighborScorer::new(), &prev, &current, &params, offset).unwrap();
    let nn_par = score(
        &NearestNeighborScorer::new().with_parallel_points(true),
        &prev,
        &current,
        &params,
        offset,
    )
    .unwrap();
    assert!((nn_seq - nn_par).abs() < 1e-9 * nn_seq.abs().max(1.0));

    let mut grid = VoxelGridScorer::new(0.1).with_parallel_points(true);
    grid.prepare(&prev);
    let grid_par = score(&grid, &prev, &current, &params, offset).unwrap();
    assert!((nn_seq - grid_par).abs() < 1e-9 * nn_seq.abs().max(1.0));
}

#[test]
fn test_score_decays_with_distance() {
    let prev = Arc::new(PointCloud::from_positions(vec![(0.0, 0.0, 0.0)]));
    let current = PointCloud::from_positions(vec![(0.0, 0.0, 0.0)]);
    let params = ScoringParams::new(0.1, 0.1, 1e-6, 1.0).unwrap();

    let mut grid = VoxelGridScorer::new(0.1);
    grid.prepare(&prev);

    for scorer in [&NearestNeighborScorer::new() as &dyn LogProbabilityScorer, &grid] {
        let mut last = f64::INFINITY;
        for step in 0..10 {
            let offset = Vector3::new(0.05 * step as f64, 0.0, 0.0);
            let lp = score(scorer, &prev, &current, &params, offset).unwrap();
            assert!(lp <= last, "{} not monotone at step {}", scorer.name(), step);
            assert!(lp >= params.log_smoothing_factor());
            last = lp;
        }
        let far = score(scorer, &prev, &current, &params, Vector3::new(10.0, 0.0, 0.0)).unwrap();
        assert!((far - params.log_smoothing_factor()).abs() < 1e-12);
    }
}

#[test]
fn test_non_finite_current_point_lands_on_floor() {
    let prev = Arc::new(PointCloud::from_positions(vec![(0.0, 0.0, 0.0)]));
    let current = PointCloud::from_positions(vec![(0.0, 0.0, 0.0), (f64::NAN, 0.0, 0.0)]);
    let params = ScoringParams::new(0.1, 0.1, 1e-6, 1.0).unwrap();

    let mut grid = VoxelGridScorer::new(0.1);
    grid.prepare(&prev);

    for scorer in [&NearestNeighborScorer::new() as &dyn LogProbabilityScorer, &grid] {
        let lp = score(scorer, &prev, &current, &params, Vector3::zeros()).unwrap();
        assert!(lp.is_finite());
        assert!((lp - params.log_smoothing_factor()).abs() < 1e-12);
    }
}

#[test]
fn test_empty_previous_cloud_floors_every_point() {
    let prev = Arc::new(PointCloud::new());
    let current = random_cloud(8, 10, 1.0);
    let params = ScoringParams::new(0.1, 0.1, 1e-3, 0.5).unwrap();
    let expected = 0.5 * 10.0 * params.log_smoothing_factor();

    let mut grid = VoxelGridScorer::new(0.1);
    grid.prepare(&prev);

    for scorer in [&NearestNeighborScorer::new() as &dyn LogProbabilityScorer, &grid] {
        let lp = score(scorer, &prev, &current, &params, Vector3::zeros()).unwrap();
        assert!((lp - expected).abs() < 1e-9);
    }
}
