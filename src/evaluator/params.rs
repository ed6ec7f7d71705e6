//! Measurement-noise parameters derived once per scoring batch.
//!
//! The Gaussian likelihood `exp(-d² / (2σ²))` is evaluated in the hot loop as
//! `exp(d² · exp_factor)` with `exp_factor = -1 / (2σ²)` precomputed here.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::types::Resolutions;
use crate::error::ScoringError;

/// Maps a sampling resolution and a sensor resolution to a noise sigma.
///
/// Implementations must be strictly increasing in both arguments and return a
/// finite, strictly positive value for finite, strictly positive input.
pub trait SigmaCalibration: Send + Sync + Debug {
    fn sigma(&self, sampling_resolution: f64, sensor_resolution: f64) -> f64;
}

/// `σ = sqrt((a·sampling)² + (b·sensor)² + σ_min²)`
///
/// Discretization error and sensor noise are treated as independent, so their
/// variances add. `min_sigma` keeps the field from collapsing at very fine
/// resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadratureCalibration {
    pub sampling_weight: f64,
    pub sensor_weight: f64,
    pub min_sigma: f64,
}

impl Default for QuadratureCalibration {
    fn default() -> Self {
        Self {
            sampling_weight: 0.5,
            sensor_weight: 1.0,
            min_sigma: 0.03,
        }
    }
}

impl SigmaCalibration for QuadratureCalibration {
    fn sigma(&self, sampling_resolution: f64, sensor_resolution: f64) -> f64 {
        let sampling = self.sampling_weight * sampling_resolution;
        let sensor = self.sensor_weight * sensor_resolution;
        (sampling * sampling + sensor * sensor + self.min_sigma * self.min_sigma).sqrt()
    }
}

/// Independence correction: the summed log-likelihood is multiplied by
/// `min(1, reference_point_count / num_points)`, so a cloud never counts as
/// more than `reference_point_count` independent observations.
pub fn discount_factor(num_points: usize, reference_point_count: usize) -> f64 {
    if num_points == 0 || num_points <= reference_point_count {
        1.0
    } else {
        reference_point_count as f64 / num_points as f64
    }
}

/// Immutable noise model for one scoring batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    sigma_xy: f64,
    sigma_z: f64,
    exp_factor_xy: f64,
    exp_factor_z: f64,
    exp_factor_xyz: f64,
    isotropic: bool,
    smoothing_factor: f64,
    discount_factor: f64,
}

impl ScoringParams {
    /// Build parameters from explicit sigmas.
    ///
    /// Isotropic scoring is selected when both sigmas agree to within
    /// floating-point tolerance; see [`ScoringParams::anisotropic`] to opt out.
    pub fn new(
        sigma_xy: f64,
        sigma_z: f64,
        smoothing_factor: f64,
        discount_factor: f64,
    ) -> Result<Self, ScoringError> {
        check_positive("sigma_xy", sigma_xy)?;
        check_positive("sigma_z", sigma_z)?;
        if !(smoothing_factor.is_finite() && smoothing_factor > 0.0 && smoothing_factor <= 1.0) {
            return Err(ScoringError::InvalidParameter {
                name: "smoothing_factor",
                value: smoothing_factor,
            });
        }
        if !(discount_factor.is_finite() && discount_factor > 0.0 && discount_factor <= 1.0) {
            return Err(ScoringError::InvalidParameter {
                name: "discount_factor",
                value: discount_factor,
            });
        }

        let isotropic = (sigma_xy - sigma_z).abs() <= 1e-12 * sigma_xy.max(sigma_z);

        Ok(Self {
            sigma_xy,
            sigma_z,
            exp_factor_xy: exp_factor(sigma_xy),
            exp_factor_z: exp_factor(sigma_z),
            exp_factor_xyz: -1.0 / (sigma_xy * sigma_xy + sigma_z * sigma_z),
            isotropic,
            smoothing_factor,
            discount_factor,
        })
    }

    /// Derive parameters from batch resolutions through a calibration.
    pub fn from_resolutions(
        resolutions: &Resolutions,
        calibration: &dyn SigmaCalibration,
        smoothing_factor: f64,
        discount_factor: f64,
    ) -> Result<Self, ScoringError> {
        resolutions.validate()?;
        let sigma_xy = calibration.sigma(resolutions.xy_sampling, resolutions.xy_sensor);
        let sigma_z = calibration.sigma(resolutions.z_sampling, resolutions.z_sensor);
        Self::new(sigma_xy, sigma_z, smoothing_factor, discount_factor)
    }

    /// Score planar and vertical components separately even if the sigmas match.
    pub fn anisotropic(mut self) -> Self {
        self.isotropic = false;
        self
    }

    pub fn with_discount_factor(self, discount_factor: f64) -> Result<Self, ScoringError> {
        Self::new(self.sigma_xy, self.sigma_z, self.smoothing_factor, discount_factor)
            .map(|p| if self.isotropic { p } else { p.anisotropic() })
    }

    pub fn sigma_xy(&self) -> f64 {
        self.sigma_xy
    }

    pub fn sigma_z(&self) -> f64 {
        self.sigma_z
    }

    pub fn exp_factor_xy(&self) -> f64 {
        self.exp_factor_xy
    }

    pub fn exp_factor_z(&self) -> f64 {
        self.exp_factor_z
    }

    pub fn exp_factor_xyz(&self) -> f64 {
        self.exp_factor_xyz
    }

    pub fn is_isotropic(&self) -> bool {
        self.isotropic
    }

    pub fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    pub fn log_smoothing_factor(&self) -> f64 {
        self.smoothing_factor.ln()
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    /// Log of the unfloored Gaussian likelihood for squared planar and
    /// vertical residuals.
    #[inline]
    pub fn exponent(&self, dxy_sq: f64, dz_sq: f64) -> f64 {
        if self.isotropic {
            (dxy_sq + dz_sq) * self.exp_factor_xyz
        } else {
            dxy_sq * self.exp_factor_xy + dz_sq * self.exp_factor_z
        }
    }

    /// Half-widths `(xy, z)` of the box outside which every per-point
    /// likelihood is already below the smoothing floor.
    pub fn floor_radius(&self) -> (f64, f64) {
        let log_floor = self.log_smoothing_factor();
        if self.isotropic {
            let r = (log_floor / self.exp_factor_xyz).sqrt();
            (r, r)
        } else {
            (
                (log_floor / self.exp_factor_xy).sqrt(),
                (log_floor / self.exp_factor_z).sqrt(),
            )
        }
    }
}

/// `-1 / (2σ²)`
pub fn exp_factor(sigma: f64) -> f64 {
    -1.0 / (2.0 * sigma * sigma)
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ScoringError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ScoringError::InvalidParameter { name, value })
    }
}
