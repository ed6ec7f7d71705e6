use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// One translation hypothesis together with the probability mass of the
/// transform-space cell it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformCandidate {
    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// Volume of the sampling cell represented by this candidate
    pub volume_weight: f64,
}

impl TransformCandidate {
    pub fn new(x: f64, y: f64, z: f64, volume_weight: f64) -> Self {
        Self {
            x,
            y,
            z,
            volume_weight,
        }
    }

    pub fn offset(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// A candidate paired with its unnormalized log-probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransform {
    transform: TransformCandidate,
    log_probability: f64,
}

impl ScoredTransform {
    pub fn new(transform: TransformCandidate, log_probability: f64) -> Self {
        Self {
            transform,
            log_probability,
        }
    }

    pub fn transform(&self) -> &TransformCandidate {
        &self.transform
    }

    pub fn log_probability(&self) -> f64 {
        self.log_probability
    }
}

/// Ordered scoring output; entry `i` belongs to input candidate `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransforms {
    scored: Vec<ScoredTransform>,
}

impl ScoredTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scored.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredTransform> {
        self.scored.iter()
    }

    pub fn as_slice(&self) -> &[ScoredTransform] {
        &self.scored
    }

    pub fn into_vec(self) -> Vec<ScoredTransform> {
        self.scored
    }

    pub fn log_probabilities(&self) -> Vec<f64> {
        self.scored.iter().map(|s| s.log_probability).collect()
    }

    /// Entry with the highest log-probability. Ties keep the earliest entry.
    pub fn best(&self) -> Option<&ScoredTransform> {
        self.scored.iter().reduce(|best, candidate| {
            if candidate.log_probability > best.log_probability {
                candidate
            } else {
                best
            }
        })
    }

    pub fn max_log_probability(&self) -> Option<f64> {
        self.best().map(|s| s.log_probability)
    }
}

impl From<Vec<ScoredTransform>> for ScoredTransforms {
    fn from(scored: Vec<ScoredTransform>) -> Self {
        Self { scored }
    }
}

impl<'a> IntoIterator for &'a ScoredTransforms {
    type Item = &'a ScoredTransform;
    type IntoIter = std::slice::Iter<'a, ScoredTransform>;

    fn into_iter(self) -> Self::IntoIter {
        self.scored.iter()
    }
}

/// Sampling and sensor resolutions for one scoring batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolutions {
    pub xy_sampling: f64,
    pub z_sampling: f64,
    pub xy_sensor: f64,
    pub z_sensor: f64,
}

impl Resolutions {
    pub fn new(xy_sampling: f64, z_sampling: f64, xy_sensor: f64, z_sensor: f64) -> Self {
        Self {
            xy_sampling,
            z_sampling,
            xy_sensor,
            z_sensor,
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let fields = [
            ("xy_sampling_resolution", self.xy_sampling),
            ("z_sampling_resolution", self.z_sampling),
            ("sensor_horizontal_resolution", self.xy_sensor),
            ("sensor_vertical_resolution", self.z_sensor),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScoringError::InvalidResolution { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_prefers_first_on_ties() {
        let a = TransformCandidate::new(0.0, 0.0, 0.0, 1.0);
        let b = TransformCandidate::new(1.0, 0.0, 0.0, 1.0);
        let scored: ScoredTransforms = vec![
            ScoredTransform::new(a, -2.0),
            ScoredTransform::new(b, -2.0),
        ]
        .into();
        assert_eq!(scored.best().unwrap().transform(), &a);
        assert_eq!(scored.max_log_probability(), Some(-2.0));
    }

    #[test]
    fn test_empty_collection_has_no_best() {
        assert!(ScoredTransforms::new().best().is_none());
    }

    #[test]
    fn test_resolution_validation() {
        assert!(Resolutions::new(0.1, 0.1, 0.01, 0.01).validate().is_ok());

        let err = Resolutions::new(0.1, 0.0, 0.01, 0.01).validate().unwrap_err();
        assert_eq!(
            err,
            ScoringError::InvalidResolution {
                name: "z_sampling_resolution",
                value: 0.0
            }
        );

        assert!(Resolutions::new(f64::NAN, 0.1, 0.01, 0.01).validate().is_err());
        assert!(Resolutions::new(0.1, 0.1, f64::INFINITY, 0.01).validate().is_err());
        assert!(Resolutions::new(0.1, 0.1, 0.01, -1.0).validate().is_err());
    }
}
