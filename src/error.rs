//! Error types for the scoring engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`crate::engine::ScoringEngine`]
#[derive(Error, Debug)]
pub enum EngineError {
    /// No artifact is active yet
    #[error("model is not available: engine has not been initialized")]
    NotReady,

    /// Another retrain currently owns the training slot
    #[error("a retrain is already in progress")]
    RetrainInProgress,

    #[error("training failed during {operation}: {source}")]
    Training {
        operation: &'static str,
        #[source]
        source: TrainingError,
    },

    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("persisting model failed during {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// Background task died before reporting a result
    #[error("background task failed: {0}")]
    Task(String),
}

/// Numerical failures of a single training attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    #[error("training set is empty")]
    EmptyDataset,

    /// Only one label present, the classifier cannot learn a boundary
    #[error("training labels contain a single class ({0})")]
    SingleClass(usize),

    #[error("not enough samples to split: {samples} records, need at least {required}")]
    InsufficientSamples { samples: usize, required: usize },

    #[error("shape mismatch: {0}")]
    Shape(String),
}

/// Failures while scoring one feature vector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("feature dimension mismatch: model expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("feature {0} is not a finite number")]
    NonFinite(String),
}

/// Artifact load/save failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("model artifact not found at {0}")]
    NotFound(PathBuf),

    #[error("model artifact at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize model artifact: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Rejected transaction fields
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("amount must be a positive finite number, got {0}")]
    Amount(f64),

    #[error("merchant category code must be exactly 4 digits, got {0:?}")]
    MerchantCategoryCode(String),

    #[error("country code must be 2 or 3 letters, got {0:?}")]
    CountryCode(String),

    #[error("hour must be in 0..=23, got {0}")]
    Hour(u8),

    #[error("day of week must be in 0..=6, got {0}")]
    DayOfWeek(u8),

    #[error("BIN must be exactly 6 digits, got {0:?}")]
    Bin(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
