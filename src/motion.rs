//! Priors over the displacement of a tracked object between two frames.
//!
//! The evaluator only needs [`MotionPrior::log_probability`]; the two
//! implementations here cover the "no prior" case and a constant-velocity
//! Gaussian.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Log-probability of a displacement over the elapsed frame interval.
pub trait MotionPrior: Send + Sync {
    fn log_probability(&self, dx: f64, dy: f64, dz: f64) -> f64;
}

/// Same log-probability for every displacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UniformMotionPrior {
    pub log_probability: f64,
}

impl UniformMotionPrior {
    pub fn new(log_probability: f64) -> Self {
        Self { log_probability }
    }
}

impl MotionPrior for UniformMotionPrior {
    fn log_probability(&self, _dx: f64, _dy: f64, _dz: f64) -> f64 {
        self.log_probability
    }
}

/// Constant-velocity model with independent Gaussian noise per axis.
///
/// The expected displacement is `mean_velocity · dt` and the per-axis
/// standard deviation is `sqrt((velocity_sigma · dt)² + min_sigma²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianMotionPrior {
    mean: Vector3<f64>,
    sigma: Vector3<f64>,
}

impl GaussianMotionPrior {
    pub fn new(
        mean_velocity: Vector3<f64>,
        velocity_sigma: Vector3<f64>,
        min_sigma: f64,
        dt: f64,
    ) -> Self {
        let sigma = velocity_sigma.map(|s| ((s * dt).powi(2) + min_sigma * min_sigma).sqrt());
        Self {
            mean: mean_velocity * dt,
            sigma,
        }
    }

    pub fn mean(&self) -> &Vector3<f64> {
        &self.mean
    }

    pub fn sigma(&self) -> &Vector3<f64> {
        &self.sigma
    }
}

impl MotionPrior for GaussianMotionPrior {
    fn log_probability(&self, dx: f64, dy: f64, dz: f64) -> f64 {
        let d = Vector3::new(dx, dy, dz);
        (0..3)
            .map(|axis| {
                let sigma = self.sigma[axis];
                let r = (d[axis] - self.mean[axis]) / sigma;
                -0.5 * r * r - sigma.ln() - 0.5 * (2.0 * PI).ln()
            })
            .sum()
    }
}
