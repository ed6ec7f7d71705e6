//! Structured span for one scoring batch.

use std::time::Instant;
use tracing::{field, span, Level, Span};
use uuid::Uuid;

use crate::evaluator::ScoringParams;

/// Span covering one `score_3d_transforms` call.
pub struct ScoringSpan {
    span: Span,
    start_time: Instant,
}

impl ScoringSpan {
    pub fn new(
        scorer_name: &str,
        num_candidates: usize,
        num_current_points: usize,
        correlation_id: Option<Uuid>,
    ) -> Self {
        let span = span!(
            Level::INFO,
            "score_transforms",
            scorer = scorer_name,
            candidates = num_candidates,
            current_points = num_current_points,
            correlation_id = field::Empty,
            sigma_xy = field::Empty,
            sigma_z = field::Empty,
            isotropic = field::Empty,
            discount_factor = field::Empty,
            best_log_probability = field::Empty,
            execution_time_ms = field::Empty
        );
        if let Some(corr_id) = correlation_id {
            span.record("correlation_id", field::display(corr_id));
        }

        Self {
            span,
            start_time: Instant::now(),
        }
    }

    /// Record the derived noise model
    pub fn record_params(&self, params: &ScoringParams) {
        self.span.record("sigma_xy", params.sigma_xy());
        self.span.record("sigma_z", params.sigma_z());
        self.span.record("isotropic", params.is_isotropic());
        self.span.record("discount_factor", params.discount_factor());
        tracing::debug!(
            parent: &self.span,
            sigma_xy = params.sigma_xy(),
            sigma_z = params.sigma_z(),
            exp_factor_xy = params.exp_factor_xy(),
            exp_factor_z = params.exp_factor_z(),
            exp_factor_xyz = params.exp_factor_xyz(),
            isotropic = params.is_isotropic(),
            smoothing_factor = params.smoothing_factor(),
            discount_factor = params.discount_factor(),
            "Scoring parameters derived"
        );
    }

    /// Record batch completion
    pub fn record_completion(&self, scored: usize, best_log_probability: Option<f64>) {
        let duration = self.start_time.elapsed();
        if let Some(best) = best_log_probability {
            self.span.record("best_log_probability", best);
        }
        self.span
            .record("execution_time_ms", duration.as_secs_f64() * 1000.0);

        tracing::info!(
            parent: &self.span,
            scored = scored,
            best_log_probability = best_log_probability,
            execution_time_ms = duration.as_millis() as u64,
            "Transform scoring completed"
        );
    }

    /// Record a rejected batch
    pub fn record_failure(&self, error: &dyn std::error::Error) {
        tracing::warn!(
            parent: &self.span,
            error = %error,
            execution_time_ms = self.start_time.elapsed().as_millis() as u64,
            "Transform scoring failed"
        );
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}
