//! Inference engine access.
//!
//! This module frames requests for the external ensemble engine, starts
//! one engine process per request and maps process outcomes to errors.

pub mod framing;
pub mod invoker;
pub mod launcher;

pub use invoker::Invoker;
pub use launcher::{CommandLauncher, EngineProcess, ProcessLauncher, ProcessOutput};
