//! Risk scoring: blend classifier probability and anomaly signal into one
//! bounded score, a confidence value, a risk level and a short reason.

use crate::error::ScoringError;
use crate::feature_vector::FeatureVector;
use crate::models::artifact::ModelArtifact;
use crate::models::isolation_forest::OUTLIER;
use crate::types::prediction::{PredictionResult, RiskLevel, RiskLevelThresholds};
use std::time::Instant;
use tracing::debug;

/// Points added when the anomaly model flags an outlier
const OUTLIER_BONUS: f64 = 20.0;
/// Scale applied to the anomaly decision value
const ANOMALY_WEIGHT: f64 = 10.0;
/// Lower bound on the anomaly adjustment
const MIN_ANOMALY_ADJUSTMENT: f64 = -10.0;
/// Confidence added when classifier and anomaly model agree
const AGREEMENT_BONUS: f64 = 0.2;

const REASON_SEPARATOR: &str = " + ";

/// Scores feature vectors against an artifact and classifies the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer {
    thresholds: RiskLevelThresholds,
}

impl RiskScorer {
    pub fn new(thresholds: RiskLevelThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskLevelThresholds {
        &self.thresholds
    }

    /// Score one vector. Names missing from `features` count as 0.0 and
    /// names outside the artifact schema are ignored.
    pub fn score(
        &self,
        features: &FeatureVector,
        artifact: &ModelArtifact,
    ) -> Result<PredictionResult, ScoringError> {
        let started = Instant::now();

        let expected = artifact.scaler.n_features();
        let aligned = features.align(&artifact.feature_names);
        if aligned.len() != expected
            || artifact.anomaly_model.n_features() != expected
            || artifact.classifier.n_features() != expected
        {
            return Err(ScoringError::DimensionMismatch {
                expected,
                actual: aligned.len(),
            });
        }
        if let Some(idx) = aligned.iter().position(|v| !v.is_finite()) {
            return Err(ScoringError::NonFinite(artifact.feature_names[idx].clone()));
        }

        let scaled = artifact.scaler.transform_row(aligned.view());
        let anomaly_score = artifact.anomaly_model.decision_function(scaled.view());
        let is_outlier = artifact.anomaly_model.predict(scaled.view()) == OUTLIER;
        let fraud_probability = artifact.classifier.predict_proba(scaled.view());

        let risk_score = combined_risk_score(fraud_probability, anomaly_score, is_outlier);
        let confidence = confidence(fraud_probability, is_outlier);
        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        debug!(
            risk_score,
            fraud_probability,
            anomaly_score,
            is_outlier,
            version = %artifact.version,
            "Feature vector scored"
        );

        Ok(PredictionResult {
            risk_score,
            fraud_probability: fraud_probability.clamp(0.0, 1.0),
            confidence,
            anomaly_score,
            is_outlier,
            model_version: artifact.version.to_string(),
            processing_time_ms,
        })
    }

    pub fn risk_level(&self, risk_score: f64) -> RiskLevel {
        RiskLevel::from_risk_score(risk_score, &self.thresholds)
    }

    /// Human-readable summary of the factors behind a prediction.
    pub fn decision_reason(&self, features: &FeatureVector, prediction: &PredictionResult) -> String {
        let mut reasons = Vec::new();
        if features.flag("is_high_amount") {
            reasons.push("High amount");
        }
        if features.flag("mcc_high_risk") {
            reasons.push("High-risk merchant category");
        }
        if features.flag("country_high_risk") {
            reasons.push("High-risk country");
        }
        if features.flag("bin_high_risk") {
            reasons.push("High-risk BIN");
        }
        if features.flag("is_night") {
            reasons.push("Night-time transaction");
        }
        if prediction.is_outlier {
            reasons.push("Anomalous pattern");
        }

        if !reasons.is_empty() {
            return reasons.join(REASON_SEPARATOR);
        }
        match self.risk_level(prediction.risk_score) {
            RiskLevel::Low => "No significant risk factors".to_string(),
            RiskLevel::Medium | RiskLevel::High => "Model pattern match".to_string(),
        }
    }
}

/// Blend classifier probability and anomaly decision value into a 0-100 score.
///
/// Negative (anomalous) decision values raise the score, positive ones lower
/// it, and the adjustment never adds more than 10 points on its own.
pub fn combined_risk_score(fraud_probability: f64, anomaly_score: f64, is_outlier: bool) -> f64 {
    let rf_score = fraud_probability * 100.0;
    let anomaly_bonus = if is_outlier { OUTLIER_BONUS } else { 0.0 };
    let anomaly_adjustment = (anomaly_score * ANOMALY_WEIGHT).max(MIN_ANOMALY_ADJUSTMENT);

    (rf_score + anomaly_bonus - anomaly_adjustment).clamp(0.0, 100.0)
}

/// Distance of the classifier from indecision, plus a bonus when the
/// classifier's fraud call matches the anomaly model's outlier call.
pub fn confidence(fraud_probability: f64, is_outlier: bool) -> f64 {
    let rf_confidence = 2.0 * (fraud_probability - 0.5).abs();
    let agreement_bonus = if (fraud_probability > 0.5) == is_outlier {
        AGREEMENT_BONUS
    } else {
        0.0
    };
    (rf_confidence + agreement_bonus).clamp(0.0, 1.0)
}
