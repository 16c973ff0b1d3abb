//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// dxpipe - differential diagnosis service for an external ensemble engine
///
/// Serves the prediction API. Each request spawns one engine process,
/// sends it the clinical feature vector as a JSON line and resolves the
/// primary condition from the engine's reply.
///
/// Examples:
///   dxpipe
///   dxpipe --bind 0.0.0.0:5000 --engine python3 --engine-args server/ml/predict.py
///   dxpipe --config deploy/dxpipe.toml --strict
///   dxpipe --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Address to listen on (overrides config)
    #[arg(short, long, value_name = "ADDR", env = "DXPIPE_BIND")]
    pub bind: Option<String>,

    /// Inference engine executable (overrides config)
    #[arg(short, long, value_name = "PROGRAM", env = "DXPIPE_ENGINE")]
    pub engine: Option<String>,

    /// Arguments for the engine executable (comma-separated)
    ///
    /// Example: --engine-args server/ml/predict.py
    #[arg(long, value_name = "ARGS", value_delimiter = ',')]
    pub engine_args: Option<Vec<String>>,

    /// Working directory for the engine process
    #[arg(long, value_name = "DIR")]
    pub engine_dir: Option<PathBuf>,

    /// Kill the engine after this many seconds
    ///
    /// By default the service waits for the engine indefinitely.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Reject required fields with wrong types or out-of-range values
    #[arg(long)]
    pub strict: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dxpipe.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .dxpipe.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref bind) = self.bind {
            if bind.parse::<SocketAddr>().is_err() {
                return Err(format!("Invalid bind address: {}", bind));
            }
        }

        if let Some(ref engine) = self.engine {
            if engine.trim().is_empty() {
                return Err("Engine program must not be empty".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref dir) = self.engine_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "Engine directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
