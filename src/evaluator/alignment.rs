use nalgebra::Vector3;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::params::{discount_factor, ScoringParams, SigmaCalibration};
use super::traits::{LogProbabilityScorer, ScoringContext};
use super::types::{Resolutions, ScoredTransform, ScoredTransforms, TransformCandidate};
use crate::cloud::PointCloud;
use crate::config::{Config, ScoringConfig};
use crate::error::ScoringError;
use crate::logging::{self, ScoringSpan};
use crate::motion::MotionPrior;
use crate::scorers::build_scorer;

/// Scores candidate translations of the current frame against the registered
/// previous frame.
///
/// Registration takes `&mut self` and scoring takes `&self`, so a scoring
/// batch can never overlap a re-registration.
pub struct AlignmentEvaluator {
    scorer: Box<dyn LogProbabilityScorer>,
    calibration: Option<Box<dyn SigmaCalibration>>,
    settings: ScoringConfig,
    parallel: bool,
    prev_points: Option<Arc<PointCloud>>,
}

impl AlignmentEvaluator {
    pub fn new(scorer: Box<dyn LogProbabilityScorer>) -> Self {
        Self {
            scorer,
            calibration: None,
            settings: ScoringConfig::default(),
            parallel: true,
            prev_points: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(build_scorer(&config.evaluation))
            .with_settings(config.scoring.clone())
            .with_parallel(config.evaluation.parallel)
    }

    /// Replace the scoring constants.
    ///
    /// `settings.calibration` is used unless a calibration was installed with
    /// [`Self::with_calibration`], regardless of builder order.
    pub fn with_settings(mut self, settings: ScoringConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Install a custom sigma calibration; it takes precedence over
    /// `settings.calibration`.
    pub fn with_calibration(mut self, calibration: Box<dyn SigmaCalibration>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    fn calibration(&self) -> &dyn SigmaCalibration {
        match &self.calibration {
            Some(calibration) => calibration.as_ref(),
            None => &self.settings.calibration,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub fn settings(&self) -> &ScoringConfig {
        &self.settings
    }

    pub fn prev_points(&self) -> Option<&Arc<PointCloud>> {
        self.prev_points.as_ref()
    }

    /// Register the previous frame, replacing any earlier one.
    pub fn set_prev_points(&mut self, prev_points: Arc<PointCloud>) {
        tracing::debug!(
            points = prev_points.len(),
            scorer = self.scorer.name(),
            "Registering previous points"
        );
        self.scorer.prepare(&prev_points);
        self.prev_points = Some(prev_points);
    }

    /// Derive the noise model for a batch.
    pub fn init(
        &self,
        resolutions: &Resolutions,
        num_current_points: usize,
    ) -> Result<ScoringParams, ScoringError> {
        if self.settings.reference_point_count == 0 {
            return Err(ScoringError::InvalidParameter {
                name: "reference_point_count",
                value: 0.0,
            });
        }
        let discount = discount_factor(num_current_points, self.settings.reference_point_count);
        let params = ScoringParams::from_resolutions(
            resolutions,
            self.calibration(),
            self.settings.smoothing_factor,
            discount,
        )?;
        Ok(if self.settings.force_anisotropic {
            params.anisotropic()
        } else {
            params
        })
    }

    /// Score every candidate; entry `i` of the result belongs to `transforms[i]`.
    pub fn score_3d_transforms(
        &self,
        current_points: &PointCloud,
        current_points_centroid: &Vector3<f64>,
        resolutions: &Resolutions,
        transforms: &[TransformCandidate],
        motion_model: &dyn MotionPrior,
    ) -> Result<ScoredTransforms, ScoringError> {
        self.run_batch(
            current_points,
            current_points_centroid,
            resolutions,
            transforms,
            motion_model,
            None,
        )
    }

    /// As [`Self::score_3d_transforms`], stopping with
    /// [`ScoringError::Cancelled`] once `cancel` is observed set. The flag is
    /// polled once per candidate.
    pub fn score_3d_transforms_with_cancel(
        &self,
        current_points: &PointCloud,
        current_points_centroid: &Vector3<f64>,
        resolutions: &Resolutions,
        transforms: &[TransformCandidate],
        motion_model: &dyn MotionPrior,
        cancel: &AtomicBool,
    ) -> Result<ScoredTransforms, ScoringError> {
        self.run_batch(
            current_points,
            current_points_centroid,
            resolutions,
            transforms,
            motion_model,
            Some(cancel),
        )
    }

    /// Score with an explicit noise model instead of one derived by [`Self::init`].
    pub fn score_with_params(
        &self,
        current_points: &PointCloud,
        current_points_centroid: &Vector3<f64>,
        params: &ScoringParams,
        transforms: &[TransformCandidate],
        motion_model: &dyn MotionPrior,
    ) -> Result<ScoredTransforms, ScoringError> {
        let span = ScoringSpan::new(
            self.scorer.name(),
            transforms.len(),
            current_points.len(),
            logging::get_correlation_id(),
        );
        let _enter = span.enter();
        let result = self.score_batch(
            current_points,
            current_points_centroid,
            params,
            transforms,
            motion_model,
            None,
            &span,
        );
        if let Err(e) = &result {
            span.record_failure(e);
        }
        result
    }

    fn run_batch(
        &self,
        current_points: &PointCloud,
        current_points_centroid: &Vector3<f64>,
        resolutions: &Resolutions,
        transforms: &[TransformCandidate],
        motion_model: &dyn MotionPrior,
        cancel: Option<&AtomicBool>,
    ) -> Result<ScoredTransforms, ScoringError> {
        let span = ScoringSpan::new(
            self.scorer.name(),
            transforms.len(),
            current_points.len(),
            logging::get_correlation_id(),
        );
        let _enter = span.enter();

        let result = self
            .ensure_prev_points()
            .and_then(|_| self.init(resolutions, current_points.len()))
            .and_then(|params| {
                self.score_batch(
                    current_points,
                    current_points_centroid,
                    &params,
                    transforms,
                    motion_model,
                    cancel,
                    &span,
                )
            });
        if let Err(e) = &result {
            span.record_failure(e);
        }
        result
    }

    fn ensure_prev_points(&self) -> Result<&PointCloud, ScoringError> {
        self.prev_points
            .as_deref()
            .ok_or(ScoringError::MissingPrevPoints)
    }

    #[allow(clippy::too_many_arguments)]
    fn score_batch(
        &self,
        current_points: &PointCloud,
        current_points_centroid: &Vector3<f64>,
        params: &ScoringParams,
        transforms: &[TransformCandidate],
        motion_model: &dyn MotionPrior,
        cancel: Option<&AtomicBool>,
        span: &ScoringSpan,
    ) -> Result<ScoredTransforms, ScoringError> {
        let prev_points = self.ensure_prev_points()?;
        span.record_params(params);

        if !current_points_centroid.iter().all(|v| v.is_finite()) {
            return Err(ScoringError::NonFiniteCentroid {
                x: current_points_centroid.x,
                y: current_points_centroid.y,
                z: current_points_centroid.z,
            });
        }
        for (index, t) in transforms.iter().enumerate() {
            if !(t.x.is_finite() && t.y.is_finite() && t.z.is_finite()) {
                return Err(ScoringError::NonFiniteOffset {
                    index,
                    x: t.x,
                    y: t.y,
                    z: t.z,
                });
            }
            if !(t.volume_weight.is_finite() && t.volume_weight > 0.0) {
                return Err(ScoringError::InvalidVolumeWeight {
                    index,
                    value: t.volume_weight,
                });
            }
        }

        let ctx = ScoringContext {
            prev_points,
            current_points,
            current_points_centroid,
            motion_model,
            params,
        };

        let scored: Vec<ScoredTransform> = if self.parallel {
            transforms
                .par_iter()
                .enumerate()
                .map(|(index, t)| self.score_candidate(&ctx, index, t, cancel))
                .collect::<Result<_, _>>()?
        } else {
            transforms
                .iter()
                .enumerate()
                .map(|(index, t)| self.score_candidate(&ctx, index, t, cancel))
                .collect::<Result<_, _>>()?
        };

        let scored = ScoredTransforms::from(scored);
        span.record_completion(scored.len(), scored.max_log_probability());
        Ok(scored)
    }

    fn score_candidate(
        &self,
        ctx: &ScoringContext<'_>,
        index: usize,
        transform: &TransformCandidate,
        cancel: Option<&AtomicBool>,
    ) -> Result<ScoredTransform, ScoringError> {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(ScoringError::Cancelled { index });
        }

        let measurement = self.scorer.log_probability(ctx, &transform.offset())?;
        if !measurement.is_finite() {
            tracing::warn!(
                index,
                value = measurement,
                scorer = self.scorer.name(),
                "Rejecting non-finite measurement log-probability"
            );
            return Err(ScoringError::NonFiniteScore {
                scorer: self.scorer.name().to_string(),
                index,
                value: measurement,
            });
        }

        let motion = ctx
            .motion_model
            .log_probability(transform.x, transform.y, transform.z);
        if !motion.is_finite() {
            tracing::warn!(index, value = motion, "Rejecting non-finite motion prior");
            return Err(ScoringError::NonFiniteMotionPrior {
                index,
                value: motion,
            });
        }

        let log_probability = measurement + motion + transform.volume_weight.ln();
        tracing::trace!(
            index,
            x = transform.x,
            y = transform.y,
            z = transform.z,
            measurement,
            motion,
            log_probability,
            "Scored transform"
        );
        Ok(ScoredTransform::new(*transform, log_probability))
    }
}

impl Default for AlignmentEvaluator {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl std::fmt::Debug for AlignmentEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentEvaluator")
            .field("scorer", &self.scorer.name())
            .field("calibration", &self.calibration())
            .field("settings", &self.settings)
            .field("parallel", &self.parallel)
            .field("prev_points", &self.prev_points.as_ref().map(|p| p.len()))
            .finish()
    }
}
