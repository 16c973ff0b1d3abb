//! dxpipe - differential diagnosis orchestration
//!
//! Validates clinical feature vectors, runs an external ensemble
//! inference engine once per request over a line-delimited JSON protocol,
//! aggregates per-model scores for two conditions and resolves which
//! condition to present as primary.

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod validation;

pub use error::PipelineError;
pub use models::{
    ClinicalFeatureVector, Condition, ConditionPredictionSet, DiagnosisState,
    DifferentialDiagnosis, ModelEntry, ModelPrediction, PredictionResult, ResolvedPrediction,
};
pub use pipeline::Pipeline;
