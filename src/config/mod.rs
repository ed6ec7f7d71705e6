use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::evaluator::QuadratureCalibration;
use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Measurement-model constants that do not change between batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum per-point probability, in (0, 1]
    pub smoothing_factor: f64,
    /// Clouds larger than this count as this many independent points
    pub reference_point_count: usize,
    pub calibration: QuadratureCalibration,
    /// Score xy and z separately even when the sigmas coincide
    pub force_anisotropic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    NearestNeighbor,
    VoxelGrid,
}

impl std::str::FromStr for ScorerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nn" | "nearest" | "nearest_neighbor" => Ok(Self::NearestNeighbor),
            "grid" | "voxel" | "voxel_grid" => Ok(Self::VoxelGrid),
            other => Err(anyhow::anyhow!("Unknown scorer: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub scorer: ScorerKind,
    /// Edge length of the voxel grid cells, in meters
    pub voxel_size: f64,
    /// Score candidates on the rayon thread pool
    pub parallel: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 1e-4,
            reference_point_count: 150,
            calibration: QuadratureCalibration::default(),
            force_anisotropic: false,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerKind::VoxelGrid,
            voxel_size: 0.1,
            parallel: true,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> crate::Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let scoring = &self.scoring;

        if !(scoring.smoothing_factor > 0.0 && scoring.smoothing_factor <= 1.0) {
            errors.push("smoothing_factor must be in (0, 1]".to_string());
        }

        if scoring.reference_point_count == 0 {
            errors.push("reference_point_count must be positive".to_string());
        }

        let calibration = &scoring.calibration;
        if !(calibration.sampling_weight.is_finite() && calibration.sampling_weight > 0.0) {
            errors.push("calibration sampling_weight must be positive".to_string());
        }
        if !(calibration.sensor_weight.is_finite() && calibration.sensor_weight > 0.0) {
            errors.push("calibration sensor_weight must be positive".to_string());
        }
        if !(calibration.min_sigma.is_finite() && calibration.min_sigma >= 0.0) {
            errors.push("calibration min_sigma must be non-negative".to_string());
        }

        if !(self.evaluation.voxel_size.is_finite() && self.evaluation.voxel_size > 0.0) {
            errors.push("voxel_size must be positive".to_string());
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl std::str::FromStr for ConfigFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(anyhow::anyhow!("Unknown config format: {}", other)),
        }
    }
}

pub fn load_config_or_default(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    tracing::warn!(?errors, "Configuration validation failed, using defaults");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load config, using defaults"
                );
                Config::default()
            }
        },
        None => Config::default(),
    }
}
