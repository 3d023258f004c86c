//! Versioned bundle of fitted models

use crate::models::isolation_forest::IsolationForest;
use crate::models::random_forest::RandomForestClassifier;
use crate::models::scaler::StandardScaler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MODEL_TYPE: &str = "Ensemble (Random Forest + Isolation Forest)";

/// Dotted `major.minor.patch` model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ModelVersion {
    pub const INITIAL: ModelVersion = ModelVersion {
        major: 1,
        minor: 0,
        patch: 0,
    };

    /// Next version with the trailing component incremented
    pub fn bump_patch(self) -> Self {
        Self {
            patch: self.patch.saturating_add(1),
            ..self
        }
    }
}

impl Default for ModelVersion {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid model version {:?}, expected major.minor.patch", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for ModelVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        let parts: Vec<&str> = trimmed.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(ParseVersionError(s.to_string()));
        };
        let parse = |p: &str| p.parse::<u32>().map_err(|_| ParseVersionError(s.to_string()));
        Ok(Self {
            major: parse(*major)?,
            minor: parse(*minor)?,
            patch: parse(*patch)?,
        })
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Held-out evaluation of the classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Everything needed to score: both models, the scaler, the feature schema
/// and training metadata. Never mutated once built; a retrain produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub anomaly_model: IsolationForest,
    pub classifier: RandomForestClassifier,
    pub scaler: StandardScaler,
    /// Column order the scaler and both models were fit on
    pub feature_names: Vec<String>,
    pub version: ModelVersion,
    pub training_date: DateTime<Utc>,
    pub metrics: ModelMetrics,
    #[serde(default)]
    pub training_samples: usize,
    #[serde(default = "default_model_type")]
    pub model_type: String,
}

fn default_model_type() -> String {
    MODEL_TYPE.to_string()
}

impl ModelArtifact {
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Same models, next patch version
    pub fn bump(&self) -> ModelArtifact {
        ModelArtifact {
            version: self.version.bump_patch(),
            ..self.clone()
        }
    }

    /// Schema and every fitted component agree on the feature count
    pub fn is_consistent(&self) -> bool {
        let n = self.feature_names.len();
        n > 0
            && self.scaler.n_features() == n
            && self.anomaly_model.n_features() == n
            && self.classifier.n_features() == n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_display() {
        let v: ModelVersion = "1.2.3".parse().unwrap();
        assert_eq!(v, ModelVersion { major: 1, minor: 2, patch: 3 });
        assert_eq!(v.to_string(), "1.2.3");

        let v: ModelVersion = "v2.0.9".parse().unwrap();
        assert_eq!(v.to_string(), "2.0.9");

        assert!("1.0".parse::<ModelVersion>().is_err());
        assert!("1.0.x".parse::<ModelVersion>().is_err());
        assert!("1.0.0.0".parse::<ModelVersion>().is_err());
    }

    #[test]
    fn test_bump_increments_trailing_component() {
        assert_eq!(ModelVersion::INITIAL.bump_patch().to_string(), "1.0.1");
        let v: ModelVersion = "1.0.9".parse().unwrap();
        assert_eq!(v.bump_patch().to_string(), "1.0.10");
        assert!(v.bump_patch() > v);
    }

    #[test]
    fn test_version_serializes_as_string() {
        let json = serde_json::to_string(&ModelVersion::INITIAL).unwrap();
        assert_eq!(json, "\"1.0.0\"");
        let back: ModelVersion = serde_json::from_str("\"3.1.4\"").unwrap();
        assert_eq!(back.patch, 4);
        assert!(serde_json::from_str::<ModelVersion>("\"bogus\"").is_err());
    }
}
