//! Data models for the diagnosis pipeline.
//!
//! This module contains the structures exchanged between the validator,
//! the engine invoker, the aggregator and the resolver, and handed to the
//! presentation layer as JSON.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Reserved key holding a group's aggregate prediction.
pub const ENSEMBLE_KEY: &str = "ensemble";

/// One of the two conditions the engine scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Condition A.
    HeartDisease,
    /// Condition B, also the fallback condition.
    GastricCancer,
}

impl Condition {
    /// The condition presented when the engine's own confidence is too low.
    pub const FALLBACK: Condition = Condition::GastricCancer;

    /// Key of this condition's group in the engine response.
    pub fn key(&self) -> &'static str {
        match self {
            Condition::HeartDisease => "heart_disease",
            Condition::GastricCancer => "gastric_cancer",
        }
    }

    /// The other condition.
    pub fn other(&self) -> Condition {
        match self {
            Condition::HeartDisease => Condition::GastricCancer,
            Condition::GastricCancer => Condition::HeartDisease,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::HeartDisease => write!(f, "Heart Disease"),
            Condition::GastricCancer => write!(f, "Gastric Cancer"),
        }
    }
}

/// Validated request payload, forwarded to the engine as-is.
///
/// Holds the eleven required fields plus any passthrough fields, in the
/// order the caller supplied them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClinicalFeatureVector {
    fields: Map<String, Value>,
}

impl ClinicalFeatureVector {
    pub(crate) fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Number of fields that will be forwarded.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single sub-model's verdict for one condition.
///
/// Numbers are kept exactly as the engine wrote them; an outcome of `1.0`
/// or `-1` is carried through rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    /// Binary outcome, normally 0 or 1.
    pub prediction: Number,
    /// Confidence in `[0, 1]`. `None` for models that expose no probability.
    pub probability: Option<f64>,
    /// Held-out accuracy of the model in `[0, 1]`, when reported.
    pub model_accuracy: Option<f64>,
}

/// One non-ensemble entry of a condition group.
///
/// The engine reports a sub-model that failed to score as
/// `{"error": "..."}` and keeps it in the group alongside the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelEntry {
    Prediction(ModelPrediction),
    Failed {
        error: String,
        /// Set only when reconciliation assigns a synthetic confidence.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        probability: Option<f64>,
    },
}

impl ModelEntry {
    /// Confidence carried by this entry, if any.
    pub fn probability(&self) -> Option<f64> {
        match self {
            ModelEntry::Prediction(prediction) => prediction.probability,
            ModelEntry::Failed { probability, .. } => *probability,
        }
    }

    pub fn set_probability(&mut self, confidence: f64) {
        match self {
            ModelEntry::Prediction(prediction) => prediction.probability = Some(confidence),
            ModelEntry::Failed { probability, .. } => *probability = Some(confidence),
        }
    }

    /// The sub-model's verdict, unless it failed to score.
    pub fn prediction(&self) -> Option<&ModelPrediction> {
        match self {
            ModelEntry::Prediction(prediction) => Some(prediction),
            ModelEntry::Failed { .. } => None,
        }
    }

    /// The engine's error message for a sub-model that failed to score.
    pub fn error(&self) -> Option<&str> {
        match self {
            ModelEntry::Prediction(_) => None,
            ModelEntry::Failed { error, .. } => Some(error),
        }
    }
}

/// Sub-model predictions for one condition, plus the ensemble aggregate.
///
/// Serialized as a flat mapping of model name to prediction with the
/// reserved `ensemble` key, matching the engine's own shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionPredictionSet {
    pub ensemble: ModelPrediction,
    /// Non-ensemble models in the order the engine emitted them.
    pub models: Vec<(String, ModelEntry)>,
}

impl ConditionPredictionSet {
    /// Names of the non-ensemble models, in emitted order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|(name, _)| name.as_str())
    }

    /// Look up a sub-model by name.
    pub fn model(&self, name: &str) -> Option<&ModelEntry> {
        self.models
            .iter()
            .find(|(model, _)| model == name)
            .map(|(_, entry)| entry)
    }
}

impl Serialize for ConditionPredictionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.models.len() + 1))?;
        for (name, entry) in &self.models {
            map.serialize_entry(name, entry)?;
        }
        map.serialize_entry(ENSEMBLE_KEY, &self.ensemble)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConditionPredictionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut ensemble = None;
        let mut models = Vec::with_capacity(raw.len());

        for (name, value) in raw {
            if name == ENSEMBLE_KEY {
                let prediction: ModelPrediction = serde_json::from_value(value)
                    .map_err(|e| de::Error::custom(format!("`{}`: {}", name, e)))?;
                ensemble = Some(prediction);
            } else {
                let entry: ModelEntry = serde_json::from_value(value)
                    .map_err(|e| de::Error::custom(format!("`{}`: {}", name, e)))?;
                models.push((name, entry));
            }
        }

        let ensemble = ensemble.ok_or_else(|| de::Error::missing_field(ENSEMBLE_KEY))?;
        Ok(Self { ensemble, models })
    }
}

/// The engine's own judgement of which condition fits better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialDiagnosis {
    pub most_likely_condition: Condition,
    pub confidence: f64,
}

/// Aggregated engine output for both conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub heart_disease: ConditionPredictionSet,
    pub gastric_cancer: ConditionPredictionSet,
    pub differential_diagnosis: DifferentialDiagnosis,
}

impl PredictionResult {
    /// Borrow the group for a condition.
    pub fn group(&self, condition: Condition) -> &ConditionPredictionSet {
        match condition {
            Condition::HeartDisease => &self.heart_disease,
            Condition::GastricCancer => &self.gastric_cancer,
        }
    }

    /// Mutably borrow the group for a condition.
    pub fn group_mut(&mut self, condition: Condition) -> &mut ConditionPredictionSet {
        match condition {
            Condition::HeartDisease => &mut self.heart_disease,
            Condition::GastricCancer => &mut self.gastric_cancer,
        }
    }
}

/// Resolver state chosen from the differential-diagnosis confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisState {
    /// Confidence at or above 0.75; the engine's pick stands.
    HighConfidencePrimary,
    /// Confidence in `[0.72, 0.75)`; fallback shown with a positive outcome.
    ModerateFallbackPositive,
    /// Confidence below 0.72; fallback shown with a negative outcome.
    LowFallbackNegative,
}

impl DiagnosisState {
    /// Whether this state replaces the fallback group's confidences.
    pub fn reconciles(&self) -> bool {
        !matches!(self, DiagnosisState::HighConfidencePrimary)
    }
}

/// A synthesized confidence assigned to one sub-model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfidence {
    pub model: String,
    pub confidence: f64,
}

/// Record of the synthetic values written during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Synthesized ensemble confidence.
    pub target_confidence: f64,
    /// Ensemble outcome forced by the resolver state.
    pub forced_prediction: u8,
    pub model_confidences: Vec<ModelConfidence>,
}

/// Final pipeline output handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrediction {
    pub primary_condition: Condition,
    pub secondary_condition: Condition,
    pub state: DiagnosisState,
    #[serde(flatten)]
    pub result: PredictionResult,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reconciliation: Option<Reconciliation>,
}
