//! Benchmark candidate scoring with both correspondence strategies.

use cloud_alignment::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::sync::Arc;

fn surface_cloud(seed: u64, count: usize) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let u: f64 = rng.gen_range(0.0..1.0);
            let v: f64 = rng.gen_range(0.0..1.0);
            match i % 2 {
                0 => Point::new(u, v, 0.0),
                _ => Point::new(u, 0.0, v),
            }
        })
        .collect()
}

fn candidates(step: f64, half: i64) -> Vec<TransformCandidate> {
    let mut out = Vec::new();
    for i in -half..=half {
        for j in -half..=half {
            for k in -half..=half {
                out.push(TransformCandidate::new(
                    i as f64 * step,
                    j as f64 * step,
                    k as f64 * step,
                    step * step * step,
                ));
            }
        }
    }
    out
}

fn bench_scorers(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_3d_transforms");
    let resolutions = Resolutions::new(0.05, 0.05, 0.01, 0.01);
    let transforms = candidates(0.05, 2);
    let prior = UniformMotionPrior::default();

    for &points in &[100usize, 400, 1000] {
        let prev = Arc::new(surface_cloud(1, points));
        let current = surface_cloud(2, points);
        let centroid = current.centroid().unwrap_or_else(Vector3::zeros);

        let scorers: [(&str, Box<dyn LogProbabilityScorer>); 2] = [
            ("nearest_neighbor", Box::new(NearestNeighborScorer::new())),
            ("voxel_grid", Box::new(VoxelGridScorer::new(0.1))),
        ];
        for (name, scorer) in scorers {
            let mut evaluator = AlignmentEvaluator::new(scorer);
            evaluator.set_prev_points(Arc::clone(&prev));

            group.bench_with_input(BenchmarkId::new(name, points), &points, |b, _| {
                b.iter(|| {
                    evaluator
                        .score_3d_transforms(
                            black_box(&current),
                            &centroid,
                            &resolutions,
                            black_box(&transforms),
                            &prior,
                        )
                        .unwrap()
                })
            });
        }
    }

    group.finish();
}

fn bench_registration(c: &mut Criterion) {
    let prev = Arc::new(surface_cloud(3, 5000));
    c.bench_function("voxel_grid_prepare_5000", |b| {
        let mut scorer = VoxelGridScorer::new(0.1);
        b.iter(|| scorer.prepare(black_box(&prev)))
    });
}

criterion_group!(benches, bench_scorers, bench_registration);
criterion_main!(benches);
