//! Error types for the tollsim study
//!
//! Provides a unified error type and domain-specific error variants

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TollsimError
pub type Result<T> = std::result::Result<T, TollsimError>;

/// Unified error type for tollsim operations
#[derive(Debug, Error)]
pub enum TollsimError {
    // Adoption model / sensitivity errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // Trip record errors
    #[error("Trip record error: {0}")]
    TripRecord(#[from] TripRecordError),

    // External simulator errors
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Adoption model and sensitivity harness errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: String,
    },

    #[error("Unrecognized sweep target: {0}")]
    UnrecognizedSweepTarget(String),

    #[error("Toll price must be a non-negative finite amount, got {0}")]
    NegativeToll(f64),
}

impl ModelError {
    pub fn invalid(name: &'static str, value: f64, reason: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }
}

/// Per-record trip log errors (recoverable: the record is skipped)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TripRecordError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Vehicle {vehicle_id} could not be classified as EV or ICE (vType {vehicle_type:?})")]
    Unclassified {
        vehicle_id: String,
        vehicle_type: String,
    },
}

/// External simulator invocation errors
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Simulator config not found: {0}")]
    MissingConfig(PathBuf),

    #[error("Failed to spawn simulator {binary}: {reason}")]
    Spawn { binary: String, reason: String },

    #[error("Simulator exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Simulator timed out after {secs}s")]
    Timeout { secs: u64 },
}

// Implement From for common external error types
impl From<serde_json::Error> for TollsimError {
    fn from(err: serde_json::Error) -> Self {
        TollsimError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TollsimError {
    fn from(err: std::io::Error) -> Self {
        TollsimError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for TollsimError {
    fn from(err: anyhow::Error) -> Self {
        TollsimError::Internal(err.to_string())
    }
}
