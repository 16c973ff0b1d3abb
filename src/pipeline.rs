//! End-to-end prediction pipeline.
//!
//! validate → invoke engine → aggregate → resolve (→ reconcile). Each call
//! owns all of its state; the only suspension point is the engine exchange.

use crate::analysis::{parse, resolve};
use crate::config::Config;
use crate::engine::{CommandLauncher, Invoker, ProcessLauncher};
use crate::error::PipelineError;
use crate::models::ResolvedPrediction;
use crate::validation::{validate, ValidationOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Runs prediction requests against the inference engine.
#[derive(Clone)]
pub struct Pipeline {
    invoker: Invoker,
    validation: ValidationOptions,
}

impl Pipeline {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, validation: ValidationOptions) -> Self {
        Self {
            invoker: Invoker::new(launcher),
            validation,
        }
    }

    /// Build a pipeline that spawns the engine configured in `config`.
    pub fn from_config(config: &Config) -> Self {
        let launcher = CommandLauncher::from(&config.engine);
        let timeout = config.engine.timeout_seconds.map(Duration::from_secs);
        Self {
            invoker: Invoker::new(Arc::new(launcher)).with_timeout(timeout),
            validation: ValidationOptions::from(&config.validation),
        }
    }

    /// Fail engine exchanges that outlast `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invoker = self.invoker.with_timeout(timeout);
        self
    }

    /// Run one request with a freshly seeded random source.
    pub async fn predict(&self, raw: Value) -> Result<ResolvedPrediction, PipelineError> {
        let mut rng = StdRng::from_entropy();
        self.predict_with_rng(raw, &mut rng).await
    }

    /// Run one request, drawing reconciliation values from `rng`.
    pub async fn predict_with_rng(
        &self,
        raw: Value,
        rng: &mut StdRng,
    ) -> Result<ResolvedPrediction, PipelineError> {
        let vector = validate(raw, self.validation)?;
        debug!("Validated request with {} fields", vector.len());

        let output = self.invoker.infer(&vector).await?;
        let result = parse(&output)?;
        let resolved = resolve(result, rng);

        info!(
            "Prediction complete: primary {} ({:?})",
            resolved.primary_condition, resolved.state
        );
        Ok(resolved)
    }
}
