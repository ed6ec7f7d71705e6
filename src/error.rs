use thiserror::Error;

/// Failures surfaced by the alignment evaluator and its scoring strategies.
///
/// Every variant is reported to the immediate caller. None of them is
/// recovered internally: a bad measurement model has no sensible retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("no previous point cloud registered; call set_prev_points before scoring")]
    MissingPrevPoints,

    #[error("{name} must be finite and strictly positive (got {value})")]
    InvalidResolution { name: &'static str, value: f64 },

    #[error("{name} is out of range (got {value})")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("current points centroid is not finite: ({x}, {y}, {z})")]
    NonFiniteCentroid { x: f64, y: f64, z: f64 },

    #[error("transform {index} has a non-finite offset ({x}, {y}, {z})")]
    NonFiniteOffset { index: usize, x: f64, y: f64, z: f64 },

    #[error("transform {index} has an invalid volume weight {value}; it must be finite and > 0")]
    InvalidVolumeWeight { index: usize, value: f64 },

    #[error("scorer '{scorer}' returned a non-finite log-probability {value} for transform {index}")]
    NonFiniteScore {
        scorer: String,
        index: usize,
        value: f64,
    },

    #[error("motion prior returned a non-finite log-probability {value} for transform {index}")]
    NonFiniteMotionPrior { index: usize, value: f64 },

    #[error("scorer '{scorer}' was prepared for a different previous point cloud")]
    StaleIndex { scorer: String },

    #[error("scoring cancelled before transform {index}")]
    Cancelled { index: usize },
}
