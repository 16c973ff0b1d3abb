//! Confidence reconciliation for the fallback condition.
//!
//! Replaces a group's ensemble and sub-model confidences with synthetic
//! values whose mean equals the synthesized ensemble confidence.

use crate::models::{ConditionPredictionSet, ModelConfidence, Reconciliation};
use rand::Rng;
use serde_json::Number;
use std::ops::Range;

/// Range the synthetic ensemble confidence is drawn from.
pub const TARGET_RANGE: Range<f64> = 0.85..0.95;

/// Per-model perturbation around the target.
pub const PERTURBATION_RANGE: Range<f64> = -0.05..0.05;

/// Bounds applied to every sub-model confidence except the last.
pub const MODEL_CONFIDENCE_FLOOR: f64 = 0.75;
pub const MODEL_CONFIDENCE_CEILING: f64 = 0.99;

/// Overwrite `group` with synthetic confidences and the forced ensemble outcome.
///
/// Every sub-model entry receives a confidence, including entries the
/// engine reported as failed. The last one absorbs the remainder so the
/// mean of all sub-model confidences equals the target. It is not clamped, so it may leave
/// `[0.75, 0.99]` for unlucky draws.
pub fn reconcile<R: Rng + ?Sized>(
    group: &mut ConditionPredictionSet,
    forced_prediction: u8,
    rng: &mut R,
) -> Reconciliation {
    let target = rng.gen_range(TARGET_RANGE);
    let confidences = synthesize(target, group.models.len(), rng);

    let mut model_confidences = Vec::with_capacity(confidences.len());
    for ((name, entry), confidence) in group.models.iter_mut().zip(confidences) {
        entry.set_probability(confidence);
        model_confidences.push(ModelConfidence {
            model: name.clone(),
            confidence,
        });
    }

    group.ensemble.probability = Some(target);
    group.ensemble.prediction = Number::from(forced_prediction);

    Reconciliation {
        target_confidence: target,
        forced_prediction,
        model_confidences,
    }
}

/// Draw `count` confidences whose arithmetic mean is `target`.
pub fn synthesize<R: Rng + ?Sized>(target: f64, count: usize, rng: &mut R) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }

    let mut values = Vec::with_capacity(count);
    let mut sum = 0.0;
    for _ in 0..count - 1 {
        let perturbation = rng.gen_range(PERTURBATION_RANGE);
        let value = (target + perturbation).clamp(MODEL_CONFIDENCE_FLOOR, MODEL_CONFIDENCE_CEILING);
        sum += value;
        values.push(value);
    }
    values.push(target * count as f64 - sum);
    values
}
