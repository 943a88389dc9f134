//! @ai:module:intent Define error types for the benchmark engine
//! @ai:module:layer domain
//! @ai:module:public_api BenchError, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Unified error type for invocation, verification and classification failures
#[derive(Error, Debug)]
pub enum BenchError {
    /// Malformed identity or empty command list; raised at construction, never retried
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    /// Upstream logic bug, e.g. a partially supported batch of runs
    #[error("Inconsistent results: {0}")]
    Consistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlRead(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl BenchError {
    /// @ai:intent Build a parse error for a rejected literal
    /// @ai:effects pure
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
