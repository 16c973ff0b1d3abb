//! Inference invoker: one engine process per request.

use crate::engine::framing::encode_line;
use crate::engine::launcher::ProcessLauncher;
use crate::error::PipelineError;
use crate::models::ClinicalFeatureVector;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Message used when the engine fails without writing diagnostics.
const UNKNOWN_ENGINE_ERROR: &str = "Unknown error";

/// Runs the inference engine for a single feature vector.
#[derive(Clone)]
pub struct Invoker {
    launcher: Arc<dyn ProcessLauncher>,
    timeout: Option<Duration>,
}

impl Invoker {
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            timeout: None,
        }
    }

    /// Fail with [`PipelineError::Timeout`] if the engine runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `vector` to a fresh engine process and return its raw output.
    ///
    /// The process is killed if this future is dropped before it completes.
    pub async fn infer(&self, vector: &ClinicalFeatureVector) -> Result<Vec<u8>, PipelineError> {
        let line = encode_line(vector)
            .map_err(|e| PipelineError::EngineIo(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let process = self
            .launcher
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                program: self.launcher.program().to_string(),
                source,
            })?;

        debug!("Sending {} byte request to engine", line.len());
        let exchange = process.communicate(line);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| PipelineError::Timeout { limit })?,
            None => exchange.await,
        }
        .map_err(PipelineError::EngineIo)?;

        let diagnostics = String::from_utf8_lossy(&output.stderr);
        let diagnostics = diagnostics.trim();
        if !diagnostics.is_empty() {
            warn!("Engine diagnostics: {}", diagnostics);
        }

        if !output.success {
            let message = if diagnostics.is_empty() {
                UNKNOWN_ENGINE_ERROR.to_string()
            } else {
                diagnostics.to_string()
            };
            return Err(PipelineError::Exit {
                code: output.code,
                message,
            });
        }

        debug!("Engine produced {} bytes of output", output.stdout.len());
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::launcher::testing::FakeLauncher;
    use crate::engine::launcher::ProcessOutput;
    use crate::validation::{validate, ValidationOptions};
    use serde_json::json;

    fn vector() -> ClinicalFeatureVector {
        validate(
            json!({
                "Age": 61, "Sex": "F", "ChestPainType": "NAP", "RestingBP": 130,
                "Cholesterol": 210, "FastingBS": 1, "RestingECG": "ST", "MaxHR": 120,
                "ExerciseAngina": "Y", "Oldpeak": 2.0, "ST_Slope": "Down"
            }),
            ValidationOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_is_one_json_line() {
        let launcher = FakeLauncher::replying(ProcessOutput::exited(0, "{}", ""));
        let invoker = Invoker::new(Arc::new(launcher.clone()));

        let output = invoker.infer(&vector()).await.unwrap();
        assert_eq!(output, b"{}".to_vec());

        let inputs = launcher.recorded_inputs();
        assert_eq!(inputs.len(), 1);
        let line = &inputs[0];
        assert_eq!(line.last(), Some(&b'\n'));
        let sent: serde_json::Value = serde_json::from_slice(line).unwrap();
        assert_eq!(sent["ChestPainType"], "NAP");
    }

    #[tokio::test]
    async fn test_each_call_spawns_fresh_process() {
        let launcher = FakeLauncher::replying(ProcessOutput::exited(0, "{}", ""));
        let invoker = Invoker::new(Arc::new(launcher.clone()));
        invoker.infer(&vector()).await.unwrap();
        invoker.infer(&vector()).await.unwrap();
        assert_eq!(launcher.spawn_count(), 2);
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_diagnostics() {
        let launcher = FakeLauncher::replying(ProcessOutput::exited(1, "{\"partial\":1}", "bad input"));
        let invoker = Invoker::new(Arc::new(launcher));

        match invoker.infer(&vector()).await {
            Err(PipelineError::Exit { code, message }) => {
                assert_eq!(code, Some(1));
                assert!(message.contains("bad input"));
            }
            other => panic!("expected Exit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_diagnostics() {
        let launcher = FakeLauncher::replying(ProcessOutput::exited(2, "", "  \n"));
        let invoker = Invoker::new(Arc::new(launcher));
        match invoker.infer(&vector()).await {
            Err(PipelineError::Exit { message, .. }) => assert_eq!(message, UNKNOWN_ENGINE_ERROR),
            other => panic!("expected Exit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_touches_no_stream() {
        let launcher = FakeLauncher::failing_to_spawn(io::ErrorKind::NotFound);
        let invoker = Invoker::new(Arc::new(launcher.clone()));

        let err = invoker.infer(&vector()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
        assert_eq!(launcher.spawn_count(), 0);
        assert!(launcher.recorded_inputs().is_empty());
    }

    #[tokio::test]
    async fn test_sub_second_timeout_reports_its_limit() {
        let launcher = FakeLauncher::replying(ProcessOutput::exited(0, "{}", ""))
            .with_delay(Duration::from_secs(30));
        let limit = Duration::from_millis(50);
        let invoker = Invoker::new(Arc::new(launcher)).with_timeout(Some(limit));

        let err = invoker.infer(&vector()).await.unwrap_err();
        match &err {
            PipelineError::Timeout { limit: reported } => assert_eq!(*reported, limit),
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(err.to_string().contains("50ms"));
    }

    #[tokio::test]
    async fn test_stderr_on_success_is_not_an_error() {
        let launcher = FakeLauncher::replying(ProcessOutput::exited(0, "{}", "UserWarning: sklearn"));
        let invoker = Invoker::new(Arc::new(launcher));
        assert!(invoker.infer(&vector()).await.is_ok());
    }
}
