#![allow(dead_code)]

use fraud_risk_engine::{AppConfig, ScoringEngine, Transaction};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

/// Config writing artifacts under `dir`, with forests small enough for tests
pub fn small_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.model.dir = dir.path().to_string_lossy().into_owned();
    config.model.retrain_interval_hours = 0;
    config.training.samples = 1_500;
    config.training.anomaly.n_estimators = 25;
    config.training.classifier.n_estimators = 20;
    config.training.classifier.max_depth = 8;
    config
}

/// Engine trained once on the default hyper-parameters and shared by the
/// scenario tests.
pub fn scenario_engine() -> Arc<ScoringEngine> {
    static ENGINE: OnceLock<(TempDir, Arc<ScoringEngine>)> = OnceLock::new();
    let (_, engine) = ENGINE.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.model.dir = dir.path().to_string_lossy().into_owned();
        config.model.retrain_interval_hours = 0;
        // rows without risk factors are labeled 50/50; more of them keeps
        // the forest's estimate for that region stable
        config.training.samples = 30_000;

        let engine = Arc::new(ScoringEngine::new(config));
        engine.initialize().unwrap();
        (dir, engine)
    });
    Arc::clone(engine)
}

pub fn high_risk_transaction() -> Transaction {
    Transaction::new(2_000_000.0, "7995", "VE", 23, 3, "411111")
}

pub fn low_risk_transaction() -> Transaction {
    Transaction::new(50_000.0, "5999", "US", 14, 3, "411111")
}
