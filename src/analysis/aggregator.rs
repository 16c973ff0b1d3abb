//! Engine response aggregation.
//!
//! Turns the engine's raw output into a [`PredictionResult`], splitting each
//! condition group into its ensemble aggregate and its sub-models. Numeric
//! values are not checked here, and a sub-model the engine reports as
//! failed stays in its group.

use crate::engine::framing::decode_document;
use crate::error::PipelineError;
use crate::models::{Condition, ConditionPredictionSet, DifferentialDiagnosis, PredictionResult};
use serde_json::{Map, Value};
use tracing::debug;

const ERROR_KEY: &str = "error";
const DIAGNOSIS_KEY: &str = "differential_diagnosis";

/// Parse raw engine output into a prediction result.
pub fn parse(raw: &[u8]) -> Result<PredictionResult, PipelineError> {
    let document = decode_document(raw)?;

    let Value::Object(mut payload) = document else {
        return Err(PipelineError::MalformedResponse(
            "engine response is not a JSON object".to_string(),
        ));
    };

    if let Some(error) = payload.get(ERROR_KEY) {
        return Err(PipelineError::EngineReported(error_text(error)));
    }

    let heart_disease = take_group(&mut payload, Condition::HeartDisease)?;
    let gastric_cancer = take_group(&mut payload, Condition::GastricCancer)?;

    let diagnosis = payload.remove(DIAGNOSIS_KEY).ok_or_else(|| {
        PipelineError::MalformedResponse(format!("missing `{}`", DIAGNOSIS_KEY))
    })?;
    let differential_diagnosis: DifferentialDiagnosis = serde_json::from_value(diagnosis)
        .map_err(|e| PipelineError::MalformedResponse(format!("{}: {}", DIAGNOSIS_KEY, e)))?;

    debug!(
        "Aggregated {} + {} sub-models, engine favours {:?} at {:.3}",
        heart_disease.models.len(),
        gastric_cancer.models.len(),
        differential_diagnosis.most_likely_condition,
        differential_diagnosis.confidence
    );

    Ok(PredictionResult {
        heart_disease,
        gastric_cancer,
        differential_diagnosis,
    })
}

/// Extract one condition group, surfacing a group-level engine error.
fn take_group(
    payload: &mut Map<String, Value>,
    condition: Condition,
) -> Result<ConditionPredictionSet, PipelineError> {
    let key = condition.key();
    let group = payload
        .remove(key)
        .ok_or_else(|| PipelineError::MalformedResponse(format!("missing `{}` group", key)))?;

    if let Some(error) = group.get(ERROR_KEY) {
        return Err(PipelineError::EngineReported(format!(
            "{}: {}",
            key,
            error_text(error)
        )));
    }

    serde_json::from_value(group)
        .map_err(|e| PipelineError::MalformedResponse(format!("`{}` group: {}", key, e)))
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine_output() -> Value {
        json!({
            "heart_disease": {
                "logistic_regression": {"prediction": 1, "probability": 0.78, "model_accuracy": 0.85},
                "random_forest": {"prediction": 1, "probability": 0.83, "model_accuracy": 0.88},
                "ensemble": {"prediction": 1, "probability": 0.805, "model_accuracy": 0.865}
            },
            "gastric_cancer": {
                "gradient_boosting": {"prediction": 0, "probability": 0.22, "model_accuracy": 0.9},
                "svm": {"prediction": 0, "probability": 0.31, "model_accuracy": 0.82},
                "knn": {"prediction": 0, "probability": 0.40, "model_accuracy": 0.79},
                "ensemble": {"prediction": 0, "probability": 0.31, "model_accuracy": 0.837}
            },
            "differential_diagnosis": {"most_likely_condition": "heart_disease", "confidence": 0.72}
        })
    }

    fn raw(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn test_groups_split_into_ensemble_and_models() {
        let output = engine_output();
        let result = parse(&raw(&output)).unwrap();

        for condition in [Condition::HeartDisease, Condition::GastricCancer] {
            let expected: Vec<&str> = output[condition.key()]
                .as_object()
                .unwrap()
                .keys()
                .map(String::as_str)
                .filter(|name| *name != "ensemble")
                .collect();
            let actual: Vec<&str> = result.group(condition).model_names().collect();
            assert_eq!(actual, expected);
        }
        assert_eq!(result.heart_disease.ensemble.probability, Some(0.805));
        assert_eq!(
            result.differential_diagnosis.most_likely_condition,
            Condition::HeartDisease
        );
    }

    #[test]
    fn test_top_level_error_short_circuits() {
        let err = parse(br#"{"error": "Failed to load models: missing pkl"}"#).unwrap_err();
        match err {
            PipelineError::EngineReported(message) => {
                assert_eq!(message, "Failed to load models: missing pkl")
            }
            other => panic!("expected EngineReported, got {:?}", other),
        }
    }

    #[test]
    fn test_group_error_is_reported_with_group_name() {
        let mut output = engine_output();
        output["gastric_cancer"] = json!({"error": "Invalid value for age"});
        output.as_object_mut().unwrap().remove("differential_diagnosis");
        match parse(&raw(&output)) {
            Err(PipelineError::EngineReported(message)) => {
                assert_eq!(message, "gastric_cancer: Invalid value for age")
            }
            other => panic!("expected EngineReported, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_ensemble_is_malformed() {
        let mut output = engine_output();
        output["heart_disease"]
            .as_object_mut()
            .unwrap()
            .remove("ensemble");
        assert!(matches!(
            parse(&raw(&output)),
            Err(PipelineError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_missing_diagnosis_is_malformed() {
        let mut output = engine_output();
        output.as_object_mut().unwrap().remove("differential_diagnosis");
        let err = parse(&raw(&output)).unwrap_err();
        assert!(err.to_string().contains("differential_diagnosis"));
    }

    #[test]
    fn test_non_json_is_malformed() {
        assert!(matches!(
            parse(b"not json at all"),
            Err(PipelineError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse(b"[1, 2]"),
            Err(PipelineError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_out_of_range_numbers_pass_through() {
        let mut output = engine_output();
        output["heart_disease"]["random_forest"]["probability"] = json!(1.7);
        output["differential_diagnosis"]["confidence"] = json!(-0.2);
        let result = parse(&raw(&output)).unwrap();
        assert_eq!(
            result.heart_disease.model("random_forest").unwrap().probability(),
            Some(1.7)
        );
        assert_eq!(result.differential_diagnosis.confidence, -0.2);
    }

    #[test]
    fn test_float_outcome_and_null_accuracy_pass_through() {
        let mut output = engine_output();
        output["gastric_cancer"]["svm"]["prediction"] = json!(1.0);
        output["gastric_cancer"]["knn"]["prediction"] = json!(-1);
        output["gastric_cancer"]["knn"]["model_accuracy"] = Value::Null;
        let result = parse(&raw(&output)).unwrap();

        let svm = result.gastric_cancer.model("svm").unwrap().prediction().unwrap();
        assert_eq!(svm.prediction.as_f64(), Some(1.0));
        let knn = result.gastric_cancer.model("knn").unwrap().prediction().unwrap();
        assert_eq!(knn.prediction.as_i64(), Some(-1));
        assert_eq!(knn.model_accuracy, None);

        let encoded = serde_json::to_value(&result).unwrap();
        assert_eq!(encoded["gastric_cancer"]["svm"]["prediction"], json!(1.0));
    }

    #[test]
    fn test_failed_sub_model_stays_in_group() {
        let mut output = engine_output();
        output["heart_disease"]["random_forest"] = json!({"error": "predict_proba failed"});
        let result = parse(&raw(&output)).unwrap();

        let names: Vec<&str> = result.heart_disease.model_names().collect();
        assert_eq!(names, vec!["logistic_regression", "random_forest"]);
        let failed = result.heart_disease.model("random_forest").unwrap();
        assert_eq!(failed.error(), Some("predict_proba failed"));
        assert_eq!(failed.probability(), None);
    }

    #[test]
    fn test_unrecognised_sub_model_entry_is_malformed() {
        let mut output = engine_output();
        output["heart_disease"]["random_forest"] = json!("n/a");
        let err = parse(&raw(&output)).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
        assert!(err.to_string().contains("random_forest"));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let mut bytes = b"\n\n".to_vec();
        bytes.extend(raw(&engine_output()));
        bytes.extend(b"\n");
        assert!(parse(&bytes).is_ok());
    }
}
