//! Error taxonomy for the prediction pipeline.

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// A required field whose value falls outside its accepted domain.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.reason)
    }
}

/// Every way a single prediction request can fail.
///
/// None of these are fatal to the hosting service; each aborts only the
/// request that produced it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid field values: {}", join_violations(.0))]
    InvalidFields(Vec<FieldViolation>),

    #[error("Failed to spawn inference engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Prediction failed: {message}")]
    Exit { code: Option<i32>, message: String },

    #[error("Inference engine stream failure: {0}")]
    EngineIo(#[source] io::Error),

    #[error("Inference engine did not finish within {limit:?}")]
    Timeout { limit: Duration },

    #[error("Failed to process prediction: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    EngineReported(String),
}

impl PipelineError {
    /// Whether the caller sent a bad request (400-class) rather than the
    /// service failing to produce a result (500-class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingFields(_) | PipelineError::InvalidFields(_)
        )
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_all() {
        let err = PipelineError::MissingFields(vec!["Age".to_string(), "ST_Slope".to_string()]);
        assert_eq!(err.to_string(), "Missing required fields: Age, ST_Slope");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_engine_failures_are_server_errors() {
        let err = PipelineError::Exit {
            code: Some(1),
            message: "bad input".to_string(),
        };
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("bad input"));

        let err = PipelineError::Spawn {
            program: "python".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("python"));
    }

    #[test]
    fn test_invalid_fields_message() {
        let err = PipelineError::InvalidFields(vec![FieldViolation {
            field: "Sex".to_string(),
            reason: "expected one of M, F".to_string(),
        }]);
        assert_eq!(
            err.to_string(),
            "Invalid field values: Sex (expected one of M, F)"
        );
    }
}
