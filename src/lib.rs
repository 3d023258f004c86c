//! Fraud Risk Engine Library
//!
//! Scores payment transactions by blending an isolation forest anomaly
//! signal with a random forest fraud probability, and manages the trained
//! model artifact through load, train, persist and retrain.

pub mod config;
pub mod engine;
pub mod error;
pub mod feature_encoder;
pub mod feature_vector;
pub mod metrics;
pub mod models;
pub mod scoring;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use engine::{EngineState, ScoringEngine};
pub use error::{EngineError, ScoringError, StoreError, TrainingError, ValidationError};
pub use feature_encoder::FeatureEncoder;
pub use feature_vector::FeatureVector;
pub use models::{ModelArtifact, ModelStore, ModelVersion};
pub use scoring::RiskScorer;
pub use types::{
    prediction::{ModelInfo, PredictionResult, RetrainOutcome, RiskLevel, ScoreResponse},
    transaction::Transaction,
};
