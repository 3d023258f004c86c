//! End-to-end training: split, scale, fit both forests, evaluate.

use crate::config::TrainingConfig;
use crate::error::TrainingError;
use crate::feature_encoder::FEATURE_NAMES;
use crate::models::artifact::{ModelArtifact, ModelMetrics, ModelVersion, MODEL_TYPE};
use crate::models::isolation_forest::IsolationForest;
use crate::models::random_forest::RandomForestClassifier;
use crate::models::scaler::StandardScaler;
use crate::training::dataset::{stratified_split, Dataset, LabeledRecord};
use crate::training::synthetic::SyntheticDataGenerator;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

/// Produces a fresh [`ModelArtifact`] from labeled records.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Generate `config.samples` synthetic records and fit on them.
    pub fn fit_synthetic(&self, version: ModelVersion) -> Result<ModelArtifact, TrainingError> {
        let records = SyntheticDataGenerator::new(self.config.seed).generate(self.config.samples);
        self.fit(&records, version)
    }

    /// Fit scaler, anomaly model and classifier, stamping the result with `version`.
    ///
    /// Nothing outside the returned artifact is touched, so a failure here
    /// leaves any previously active artifact intact.
    pub fn fit(
        &self,
        records: &[LabeledRecord],
        version: ModelVersion,
    ) -> Result<ModelArtifact, TrainingError> {
        let started = Instant::now();
        let feature_names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        let dataset = Dataset::from_records(records, &feature_names)?;

        let fraud = dataset.fraud_count();
        if fraud == 0 {
            return Err(TrainingError::SingleClass(0));
        }
        if fraud == dataset.len() {
            return Err(TrainingError::SingleClass(1));
        }

        let (train_idx, test_idx) =
            stratified_split(&dataset.labels, self.config.test_fraction, self.config.seed)?;
        let train = dataset.select(&train_idx);
        let test = dataset.select(&test_idx);
        debug!(
            train = train.len(),
            test = test.len(),
            fraud_rate = fraud as f64 / dataset.len() as f64,
            "Dataset split"
        );

        let scaler = StandardScaler::fit(train.features.view())?;
        let train_scaled = scaler.transform(train.features.view());
        let test_scaled = scaler.transform(test.features.view());

        let anomaly_model =
            IsolationForest::fit(train_scaled.view(), &self.config.anomaly, self.config.seed)?;
        let classifier = RandomForestClassifier::fit(
            train_scaled.view(),
            &train.labels,
            &self.config.classifier,
            self.config.seed,
        )?;

        let predicted: Vec<usize> = test_scaled
            .outer_iter()
            .map(|row| classifier.predict(row))
            .collect();
        let metrics = ModelMetrics::from_predictions(&test.labels, &predicted);

        info!(
            version = %version,
            samples = dataset.len(),
            accuracy = format!("{:.3}", metrics.accuracy),
            precision = format!("{:.3}", metrics.precision),
            recall = format!("{:.3}", metrics.recall),
            f1 = format!("{:.3}", metrics.f1_score),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model trained"
        );

        Ok(ModelArtifact {
            anomaly_model,
            classifier,
            scaler,
            feature_names,
            version,
            training_date: Utc::now(),
            metrics,
            training_samples: train.len(),
            model_type: MODEL_TYPE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TrainingConfig {
        let mut config = TrainingConfig::default();
        config.samples = 1500;
        config.anomaly.n_estimators = 20;
        config.classifier.n_estimators = 15;
        config
    }

    #[test]
    fn test_fit_produces_consistent_artifact() {
        let pipeline = TrainingPipeline::new(small_config());
        let artifact = pipeline.fit_synthetic(ModelVersion::INITIAL).unwrap();

        assert!(artifact.is_consistent());
        assert_eq!(artifact.feature_names.len(), FEATURE_NAMES.len());
        assert_eq!(artifact.version.to_string(), "1.0.0");
        assert_eq!(artifact.training_samples, 1200);
        assert!(artifact.metrics.accuracy > 0.6);
        assert!((0.0..=1.0).contains(&artifact.metrics.f1_score));
    }

    #[test]
    fn test_identical_seed_gives_identical_metrics() {
        let pipeline = TrainingPipeline::new(small_config());
        let a = pipeline.fit_synthetic(ModelVersion::INITIAL).unwrap();
        let b = pipeline.fit_synthetic(ModelVersion::INITIAL).unwrap();

        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.classifier, b.classifier);
        assert_eq!(a.anomaly_model, b.anomaly_model);
    }

    #[test]
    fn test_single_class_training_fails() {
        let pipeline = TrainingPipeline::new(small_config());
        let records: Vec<LabeledRecord> = SyntheticDataGenerator::new(1)
            .generate(100)
            .into_iter()
            .map(|mut r| {
                r.is_fraud = false;
                r
            })
            .collect();

        assert_eq!(
            pipeline.fit(&records, ModelVersion::INITIAL).unwrap_err(),
            TrainingError::SingleClass(0)
        );
    }

    #[test]
    fn test_empty_training_fails() {
        let pipeline = TrainingPipeline::new(small_config());
        assert_eq!(
            pipeline.fit(&[], ModelVersion::INITIAL).unwrap_err(),
            TrainingError::EmptyDataset
        );
    }
}
