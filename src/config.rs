//! Configuration management for the fraud risk engine

use crate::types::prediction::RiskLevelThresholds;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Model artifact location and lifecycle
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the persisted artifact
    pub dir: String,
    /// Artifact file name inside `dir`
    pub name: String,
    /// Human-readable model name reported by model info
    pub display_name: String,
    /// Hours between scheduled retrains (0 disables the scheduler)
    pub retrain_interval_hours: u64,
}

impl ModelConfig {
    /// Full path of the persisted artifact
    pub fn artifact_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.name)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: "models".to_string(),
            name: "fraud_detector_v1.json".to_string(),
            display_name: "SMAF Fraud Detector".to_string(),
            retrain_interval_hours: 24,
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DetectionConfig {
    /// Risk level classification thresholds (0-1 scale, applied to risk_score / 100)
    pub risk_levels: RiskLevelThresholds,
}

/// Training pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of synthetic records generated per training run
    pub samples: usize,
    /// Seed shared by data generation, splitting and both forests
    pub seed: u64,
    /// Fraction of records held out for evaluation
    pub test_fraction: f64,
    pub anomaly: AnomalyParams,
    pub classifier: ClassifierParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: 10_000,
            seed: 42,
            test_fraction: 0.2,
            anomaly: AnomalyParams::default(),
            classifier: ClassifierParams::default(),
        }
    }
}

/// Isolation forest hyper-parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnomalyParams {
    pub n_estimators: usize,
    /// Sub-sample size per tree (capped at the training set size)
    pub max_samples: usize,
    /// Expected fraction of outliers in the training data
    pub contamination: f64,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
        }
    }
}

/// Random forest hyper-parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Keeps leaf probabilities from collapsing onto a handful of noisy labels
    pub min_samples_leaf: usize,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `FRAUD_ENGINE__*` overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FRAUD_ENGINE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let levels = &self.detection.risk_levels;
        if !(0.0..=1.0).contains(&levels.medium) || !(0.0..=1.0).contains(&levels.high) {
            bail!(
                "risk level thresholds must lie in [0, 1] (medium={}, high={})",
                levels.medium,
                levels.high
            );
        }
        if levels.medium >= levels.high {
            bail!(
                "medium threshold {} must be below high threshold {}",
                levels.medium,
                levels.high
            );
        }

        let contamination = self.training.anomaly.contamination;
        if !(contamination > 0.0 && contamination <= 0.5) {
            bail!("contamination must be in (0, 0.5], got {}", contamination);
        }
        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            bail!(
                "test_fraction must be in (0, 1), got {}",
                self.training.test_fraction
            );
        }
        if self.training.anomaly.n_estimators == 0 || self.training.classifier.n_estimators == 0 {
            bail!("forests need at least one estimator");
        }
        if self.training.classifier.max_depth == 0 {
            bail!("classifier max_depth must be at least 1");
        }
        Ok(())
    }
}
