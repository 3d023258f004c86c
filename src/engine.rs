//! Scoring engine: owns the active model artifact and its lifecycle.
//!
//! Readers take a snapshot `Arc<ModelArtifact>` per call, so a retrain that
//! swaps the reference mid-request never affects requests already running.

use crate::config::AppConfig;
use crate::error::{EngineError, Result, StoreError};
use crate::feature_encoder::FeatureEncoder;
use crate::feature_vector::FeatureVector;
use crate::metrics::EngineMetrics;
use crate::models::artifact::{ModelArtifact, ModelVersion};
use crate::models::store::ModelStore;
use crate::scoring::RiskScorer;
use crate::training::TrainingPipeline;
use crate::types::prediction::{ModelInfo, PredictionResult, RetrainOutcome, ScoreResponse};
use crate::types::transaction::Transaction;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No artifact active, scoring is refused
    Uninitialized,
    Ready,
    /// A retrain is running; the previous artifact keeps serving
    Retraining,
}

/// Releases the retrain slot when dropped, including on panic
struct RetrainSlot<'a>(&'a AtomicBool);

impl<'a> RetrainSlot<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RetrainSlot(flag))
    }
}

impl Drop for RetrainSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fraud risk scoring service
pub struct ScoringEngine {
    config: AppConfig,
    encoder: FeatureEncoder,
    scorer: RiskScorer,
    store: ModelStore,
    active: ArcSwapOption<ModelArtifact>,
    retraining: AtomicBool,
    metrics: Arc<EngineMetrics>,
}

impl ScoringEngine {
    /// Create an engine in the `Uninitialized` state
    pub fn new(config: AppConfig) -> Self {
        Self::with_metrics(config, Arc::new(EngineMetrics::new()))
    }

    pub fn with_metrics(config: AppConfig, metrics: Arc<EngineMetrics>) -> Self {
        let scorer = RiskScorer::new(config.detection.risk_levels);
        let store = ModelStore::from_config(&config.model);
        Self {
            config,
            encoder: FeatureEncoder::new(),
            scorer,
            store,
            active: ArcSwapOption::empty(),
            retraining: AtomicBool::new(false),
            metrics,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn state(&self) -> EngineState {
        if self.active.load().is_none() {
            EngineState::Uninitialized
        } else if self.retraining.load(Ordering::Acquire) {
            EngineState::Retraining
        } else {
            EngineState::Ready
        }
    }

    /// Snapshot of the active artifact
    pub fn active_artifact(&self) -> Result<Arc<ModelArtifact>> {
        self.active.load_full().ok_or(EngineError::NotReady)
    }

    /// Load the persisted artifact, or train and persist a fresh one when it
    /// is missing or unreadable. A failed save is logged and the freshly
    /// trained artifact is still activated.
    pub fn initialize(&self) -> Result<()> {
        match self.store.load() {
            Ok(artifact) => {
                self.metrics.record_model_load();
                info!(version = %artifact.version, "Using persisted model");
                self.active.store(Some(Arc::new(artifact)));
                return Ok(());
            }
            Err(StoreError::NotFound(path)) => {
                info!(path = %path.display(), "No persisted model, training a new one");
            }
            Err(e) => {
                warn!(error = %e, "Persisted model unusable, training a new one");
            }
        }

        let artifact = self
            .pipeline()
            .fit_synthetic(ModelVersion::INITIAL)
            .map_err(|source| EngineError::Training {
                operation: "initialize",
                source,
            })?;
        self.metrics.record_model_training();

        if let Err(e) = self.store.save(&artifact) {
            error!(error = %e, "Failed to persist trained model, continuing with in-memory copy");
        }

        info!(version = %artifact.version, "Model ready");
        self.active.store(Some(Arc::new(artifact)));
        Ok(())
    }

    /// Encode, score and classify one transaction
    pub fn score(&self, transaction: &Transaction) -> Result<ScoreResponse> {
        let started = Instant::now();
        let result = self.score_transaction(transaction, started);
        match &result {
            Ok(response) => self.metrics.record_prediction(
                started.elapsed(),
                response.risk_score,
                response.risk_level,
            ),
            Err(_) => self.metrics.record_prediction_error(),
        }
        result
    }

    fn score_transaction(&self, transaction: &Transaction, started: Instant) -> Result<ScoreResponse> {
        let artifact = self.active_artifact()?;
        let features = self.encoder.encode(transaction);
        let prediction = self.scorer.score(&features, &artifact)?;

        let risk_level = self.scorer.risk_level(prediction.risk_score);
        let decision_reason = self.scorer.decision_reason(&features, &prediction);

        debug!(
            transaction_id = transaction.transaction_id.as_deref().unwrap_or("-"),
            risk_score = prediction.risk_score,
            risk_level = risk_level.as_str(),
            "Transaction scored"
        );

        Ok(ScoreResponse {
            transaction_id: transaction.transaction_id.clone(),
            risk_score: prediction.risk_score,
            fraud_probability: prediction.fraud_probability,
            confidence: prediction.confidence,
            anomaly_score: prediction.anomaly_score,
            is_outlier: prediction.is_outlier,
            model_version: prediction.model_version,
            features_used: artifact.feature_names.clone(),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            risk_level,
            decision_reason,
        })
    }

    /// Score an already-encoded feature vector against the active artifact
    pub fn score_features(&self, features: &FeatureVector) -> Result<PredictionResult> {
        let artifact = self.active_artifact()?;
        Ok(self.scorer.score(features, &artifact)?)
    }

    /// Train a replacement on fresh synthetic data, persist it, then activate it.
    ///
    /// Only one retrain runs at a time; a concurrent call gets
    /// [`EngineError::RetrainInProgress`]. Scoring continues against the old
    /// artifact throughout, and any failure leaves it active.
    pub fn retrain(&self) -> Result<RetrainOutcome> {
        let Some(_slot) = RetrainSlot::acquire(&self.retraining) else {
            return Err(EngineError::RetrainInProgress);
        };

        let result = self.retrain_locked();
        self.metrics.record_retrain(result.is_ok());
        if let Err(e) = &result {
            error!(error = %e, "Retrain failed, keeping current model");
        }
        result
    }

    fn retrain_locked(&self) -> Result<RetrainOutcome> {
        let current = self.active_artifact()?;
        let version = current.version.bump_patch();
        info!(from = %current.version, to = %version, "Retraining model");

        let mut artifact =
            self.pipeline()
                .fit_synthetic(version)
                .map_err(|source| EngineError::Training {
                    operation: "retrain",
                    source,
                })?;
        if artifact.training_date <= current.training_date {
            artifact.training_date = current.training_date + chrono::Duration::milliseconds(1);
        }

        self.store
            .save(&artifact)
            .map_err(|source| EngineError::Persistence {
                operation: "retrain",
                source,
            })?;

        let outcome = RetrainOutcome {
            model_version: artifact.version.to_string(),
            training_date: artifact.training_date,
            metrics: artifact.metrics,
        };
        self.active.store(Some(Arc::new(artifact)));

        info!(
            version = %outcome.model_version,
            f1 = format!("{:.3}", outcome.metrics.f1_score),
            "Retrained model activated"
        );
        Ok(outcome)
    }

    /// Run [`ScoringEngine::retrain`] on the blocking pool. Dropping the handle
    /// does not cancel training.
    pub fn retrain_in_background(self: Arc<Self>) -> JoinHandle<Result<RetrainOutcome>> {
        tokio::task::spawn_blocking(move || self.retrain())
    }

    /// Await a background retrain, mapping a panicked task to [`EngineError::Task`]
    pub async fn retrain_async(self: Arc<Self>) -> Result<RetrainOutcome> {
        self.retrain_in_background()
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?
    }

    /// Run [`ScoringEngine::initialize`] on the blocking pool
    pub async fn initialize_async(self: Arc<Self>) -> Result<()> {
        tokio::task::spawn_blocking(move || self.initialize())
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?
    }

    /// Configured interval between scheduled retrains, `None` when disabled
    pub fn retrain_interval(&self) -> Option<Duration> {
        match self.config.model.retrain_interval_hours {
            0 => None,
            hours => Some(Duration::from_secs(hours * 3600)),
        }
    }

    /// Retrain every `interval`. The first retrain happens one full interval
    /// after the call.
    pub fn spawn_retrain_scheduler(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match Arc::clone(&self).retrain_async().await {
                    Ok(outcome) => {
                        info!(version = %outcome.model_version, "Scheduled retrain complete")
                    }
                    Err(e) => warn!(error = %e, "Scheduled retrain failed"),
                }
            }
        })
    }

    /// Read-only snapshot of the active model
    pub fn model_info(&self) -> Result<ModelInfo> {
        let artifact = self.active_artifact()?;
        Ok(ModelInfo {
            model_name: self.config.model.display_name.clone(),
            model_version: artifact.version.to_string(),
            training_date: artifact.training_date,
            model_type: artifact.model_type.clone(),
            feature_count: artifact.feature_count(),
            feature_names: artifact.feature_names.clone(),
            metrics: artifact.metrics,
            training_samples: artifact.training_samples,
            thresholds: *self.scorer.thresholds(),
        })
    }

    fn pipeline(&self) -> TrainingPipeline {
        TrainingPipeline::new(self.config.training.clone())
    }
}
