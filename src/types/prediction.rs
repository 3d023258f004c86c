//! Prediction output data structures

use crate::models::artifact::ModelMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a 0-100 risk score. Thresholds are on the 0-1 scale and are
    /// compared against `risk_score / 100`.
    pub fn from_risk_score(risk_score: f64, thresholds: &RiskLevelThresholds) -> Self {
        let normalized = (risk_score / 100.0).clamp(0.0, 1.0);
        if normalized >= thresholds.high {
            RiskLevel::High
        } else if normalized >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Configurable risk level thresholds (0-1 scale)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub high: f64,
    pub medium: f64,
}

impl RiskLevelThresholds {
    /// Medium cutoff expressed on the 0-100 risk score scale
    pub fn medium_score(&self) -> f64 {
        self.medium * 100.0
    }

    /// High cutoff expressed on the 0-100 risk score scale
    pub fn high_score(&self) -> f64 {
        self.high * 100.0
    }
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            high: 0.7,
            medium: 0.3,
        }
    }
}

/// Raw outcome of scoring one feature vector against one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Blended risk score (0 - 100)
    pub risk_score: f64,
    /// Classifier probability of the fraud class (0 - 1)
    pub fraud_probability: f64,
    /// Decisiveness and agreement of the two models (0 - 1)
    pub confidence: f64,
    /// Isolation forest decision value; negative means anomalous
    pub anomaly_score: f64,
    pub is_outlier: bool,
    pub model_version: String,
    pub processing_time_ms: f64,
}

/// Full answer returned to the request layer for one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub risk_score: f64,
    pub fraud_probability: f64,
    pub confidence: f64,
    pub anomaly_score: f64,
    pub is_outlier: bool,
    pub model_version: String,
    pub features_used: Vec<String>,
    pub processing_time_ms: f64,
    pub risk_level: RiskLevel,
    pub decision_reason: String,
}

/// Read-only snapshot of the active model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_version: String,
    pub training_date: DateTime<Utc>,
    pub model_type: String,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub metrics: ModelMetrics,
    pub training_samples: usize,
    pub thresholds: RiskLevelThresholds,
}

/// Result of a successful retrain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainOutcome {
    pub model_version: String,
    pub training_date: DateTime<Utc>,
    pub metrics: ModelMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_score() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(RiskLevel::from_risk_score(10.0, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_risk_score(29.9, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_risk_score(30.0, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_risk_score(69.0, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_risk_score(70.0, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk_score(100.0, &thresholds), RiskLevel::High);
    }

    #[test]
    fn test_thresholds_on_score_scale() {
        let thresholds = RiskLevelThresholds::default();
        assert!((thresholds.medium_score() - 30.0).abs() < 1e-9);
        assert!((thresholds.high_score() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_response_serialization() {
        let response = ScoreResponse {
            transaction_id: None,
            risk_score: 75.5,
            fraud_probability: 0.755,
            confidence: 0.89,
            anomaly_score: -0.02,
            is_outlier: true,
            model_version: "1.0.3".to_string(),
            features_used: vec!["amount".to_string()],
            processing_time_ms: 1.2,
            risk_level: RiskLevel::High,
            decision_reason: "High amount".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"risk_level\":\"high\""));
        assert!(!json.contains("transaction_id"));

        let back: ScoreResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.risk_level, RiskLevel::High);
        assert_eq!(back.model_version, "1.0.3");
    }
}
