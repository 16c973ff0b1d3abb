//! Response analysis.
//!
//! Aggregation of engine output, primary-condition resolution and
//! confidence reconciliation.

pub mod aggregator;
pub mod reconcile;
pub mod resolver;

pub use aggregator::parse;
pub use resolver::{classify, resolve};
