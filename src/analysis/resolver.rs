//! Primary-condition resolution.
//!
//! The engine's differential-diagnosis confidence selects one of three
//! states. Below 0.75 the fallback condition is presented instead, with an
//! ensemble outcome forced by the engine's confidence and synthetic
//! confidences from [`reconcile`](super::reconcile::reconcile).

use crate::analysis::reconcile::reconcile;
use crate::models::{Condition, DiagnosisState, PredictionResult, ResolvedPrediction};
use rand::Rng;
use tracing::info;

/// Lowest confidence at which the engine's own pick is trusted.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// Lowest confidence at which the fallback is shown as a positive outcome.
pub const MODERATE_CONFIDENCE_THRESHOLD: f64 = 0.72;

/// Map a confidence to its resolver state. NaN falls through to the lowest state.
pub fn classify(confidence: f64) -> DiagnosisState {
    if confidence >= HIGH_CONFIDENCE_THRESHOLD {
        DiagnosisState::HighConfidencePrimary
    } else if confidence >= MODERATE_CONFIDENCE_THRESHOLD {
        DiagnosisState::ModerateFallbackPositive
    } else {
        DiagnosisState::LowFallbackNegative
    }
}

impl DiagnosisState {
    /// Condition presented as primary in this state.
    pub fn primary(&self, most_likely: Condition) -> Condition {
        match self {
            DiagnosisState::HighConfidencePrimary => most_likely,
            DiagnosisState::ModerateFallbackPositive | DiagnosisState::LowFallbackNegative => {
                Condition::FALLBACK
            }
        }
    }

    /// Ensemble outcome forced onto the fallback group, if any.
    pub fn forced_prediction(&self) -> Option<u8> {
        match self {
            DiagnosisState::HighConfidencePrimary => None,
            DiagnosisState::ModerateFallbackPositive => Some(1),
            DiagnosisState::LowFallbackNegative => Some(0),
        }
    }
}

/// Choose the primary condition and reconcile the fallback group when needed.
///
/// The secondary condition's group is never modified.
pub fn resolve<R: Rng + ?Sized>(mut result: PredictionResult, rng: &mut R) -> ResolvedPrediction {
    let diagnosis = &result.differential_diagnosis;
    let state = classify(diagnosis.confidence);
    let primary = state.primary(diagnosis.most_likely_condition);
    let secondary = primary.other();

    let reconciliation = state
        .forced_prediction()
        .map(|forced| reconcile(result.group_mut(primary), forced, rng));

    info!(
        "Resolved {:?} (engine confidence {:.3}): primary {}, secondary {}",
        state, result.differential_diagnosis.confidence, primary, secondary
    );

    ResolvedPrediction {
        primary_condition: primary,
        secondary_condition: secondary,
        state,
        result,
        reconciliation,
    }
}
