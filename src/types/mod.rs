//! Type definitions for the fraud risk engine

pub mod prediction;
pub mod transaction;

pub use prediction::{
    ModelInfo, PredictionResult, RetrainOutcome, RiskLevel, RiskLevelThresholds, ScoreResponse,
};
pub use transaction::Transaction;
