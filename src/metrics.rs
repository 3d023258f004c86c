//! Performance metrics and statistics tracking for the scoring engine.

use crate::types::prediction::RiskLevel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Bounded history of processing times
const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for scoring, loading and retraining
pub struct EngineMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Predictions that returned an error
    pub prediction_errors: AtomicU64,
    /// Artifacts loaded from disk
    pub model_loads: AtomicU64,
    /// Artifacts trained from scratch at startup
    pub model_trainings: AtomicU64,
    /// Successful retrains
    pub retrains: AtomicU64,
    /// Failed or rejected retrains
    pub retrain_failures: AtomicU64,
    predictions_by_level: RwLock<HashMap<RiskLevel, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Risk score histogram, ten buckets over 0-100
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            prediction_errors: AtomicU64::new(0),
            model_loads: AtomicU64::new(0),
            model_trainings: AtomicU64::new(0),
            retrains: AtomicU64::new(0),
            retrain_failures: AtomicU64::new(0),
            predictions_by_level: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, risk_score: f64, level: RiskLevel) {
        self.predictions.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }

        let bucket = ((risk_score / 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut by_level) = self.predictions_by_level.write() {
            *by_level.entry(level).or_insert(0) += 1;
        }
    }

    pub fn record_prediction_error(&self) {
        self.prediction_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_load(&self) {
        self.model_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_training(&self) {
        self.model_trainings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retrain(&self, success: bool) {
        if success {
            self.retrains.fetch_add(1, Ordering::Relaxed);
        } else {
            self.retrain_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    pub fn get_predictions_by_level(&self) -> HashMap<RiskLevel, u64> {
        self.predictions_by_level
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn log_summary(&self) {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let errors = self.prediction_errors.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let by_level = self.get_predictions_by_level();
        let level_count = |level| by_level.get(&level).copied().unwrap_or(0);

        info!(
            predictions,
            errors,
            throughput = format!("{:.1} tx/s", self.get_throughput()),
            low = level_count(RiskLevel::Low),
            medium = level_count(RiskLevel::Medium),
            high = level_count(RiskLevel::High),
            "Scoring summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );
        info!(
            loads = self.model_loads.load(Ordering::Relaxed),
            trainings = self.model_trainings.load(Ordering::Relaxed),
            retrains = self.retrains.load(Ordering::Relaxed),
            retrain_failures = self.retrain_failures.load(Ordering::Relaxed),
            score_distribution = ?self.get_score_distribution(),
            "Model lifecycle"
        );
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<EngineMetrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<EngineMetrics>, interval: Duration) -> Self {
        Self { metrics, interval }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(self.interval);
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.log_summary();
        }
    }
}
