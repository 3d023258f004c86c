mod common;

use common::{high_risk_transaction, low_risk_transaction, small_config};
use fraud_risk_engine::config::TrainingConfig;
use fraud_risk_engine::training::TrainingPipeline;
use fraud_risk_engine::{
    EngineError, EngineState, FeatureEncoder, ModelStore, ModelVersion, RiskScorer, ScoringEngine,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

#[test]
fn test_save_load_round_trip_scores_identically() {
    let dir = tempdir().unwrap();
    let mut config = TrainingConfig::default();
    config.samples = 1_000;
    config.anomaly.n_estimators = 20;
    config.classifier.n_estimators = 10;
    let artifact = TrainingPipeline::new(config)
        .fit_synthetic(ModelVersion::INITIAL)
        .unwrap();

    let store = ModelStore::new(dir.path(), "round_trip.json");
    store.save(&artifact).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded.feature_names, artifact.feature_names);
    assert_eq!(loaded.version, artifact.version);
    assert_eq!(loaded.metrics, artifact.metrics);

    let scorer = RiskScorer::default();
    let encoder = FeatureEncoder::new();
    for tx in [high_risk_transaction(), low_risk_transaction()] {
        let probe = encoder.encode(&tx);
        let before = scorer.score(&probe, &artifact).unwrap();
        let after = scorer.score(&probe, &loaded).unwrap();
        assert!((before.risk_score - after.risk_score).abs() < 1e-9);
        assert!((before.fraud_probability - after.fraud_probability).abs() < 1e-12);
        assert_eq!(before.is_outlier, after.is_outlier);
    }
}

#[test]
fn test_corrupt_artifact_falls_back_to_training() {
    let dir = tempdir().unwrap();
    let config = small_config(&dir);
    let path = config.model.artifact_path();
    std::fs::write(&path, b"{ not a model").unwrap();

    let engine = ScoringEngine::new(config);
    engine.initialize().unwrap();

    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.model_info().unwrap().model_version, "1.0.0");
    // the unreadable file was replaced by the freshly trained artifact
    let reloaded = ModelStore::new(dir.path(), &engine.config().model.name)
        .load()
        .unwrap();
    assert_eq!(reloaded.version, ModelVersion::INITIAL);
}

#[test]
fn test_retrain_increments_patch_and_date() {
    let dir = tempdir().unwrap();
    let engine = ScoringEngine::new(small_config(&dir));
    engine.initialize().unwrap();

    let first = engine.model_info().unwrap();
    let outcome = engine.retrain().unwrap();
    let second = engine.retrain().unwrap();

    assert_eq!(first.model_version, "1.0.0");
    assert_eq!(outcome.model_version, "1.0.1");
    assert_eq!(second.model_version, "1.0.2");
    assert!(outcome.training_date > first.training_date);
    assert!(second.training_date > outcome.training_date);

    let info = engine.model_info().unwrap();
    assert_eq!(info.model_version, "1.0.2");
    assert_eq!(info.training_date, second.training_date);
    assert_eq!(engine.score(&low_risk_transaction()).unwrap().model_version, "1.0.2");
}

#[test]
fn test_scoring_continues_during_retrain() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(ScoringEngine::new(small_config(&dir)));
    engine.initialize().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut versions = HashSet::new();
                let mut scored = 0usize;
                while !done.load(Ordering::Acquire) || scored == 0 {
                    let response = engine.score(&high_risk_transaction()).unwrap();
                    assert!((0.0..=100.0).contains(&response.risk_score));
                    versions.insert(response.model_version);
                    scored += 1;
                }
                versions
            })
        })
        .collect();

    let outcome = engine.retrain().unwrap();
    done.store(true, Ordering::Release);

    let allowed: HashSet<String> = ["1.0.0", "1.0.1"].iter().map(|s| s.to_string()).collect();
    for reader in readers {
        let versions = reader.join().unwrap();
        assert!(versions.is_subset(&allowed), "unexpected versions {versions:?}");
    }
    assert_eq!(outcome.model_version, "1.0.1");
    assert_eq!(engine.state(), EngineState::Ready);
}

#[test]
fn test_uninitialized_engine_refuses_work() {
    let dir = tempdir().unwrap();
    let engine = ScoringEngine::new(small_config(&dir));

    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert!(matches!(
        engine.score(&low_risk_transaction()),
        Err(EngineError::NotReady)
    ));
    assert!(matches!(engine.retrain(), Err(EngineError::NotReady)));
    assert!(!engine.store().path().exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_retrain_outlives_dropped_handle() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(ScoringEngine::new(small_config(&dir)));
    Arc::clone(&engine).initialize_async().await.unwrap();

    drop(Arc::clone(&engine).retrain_in_background());

    let mut waited = 0;
    while engine.model_info().unwrap().model_version != "1.0.1" {
        assert!(waited < 600, "background retrain never completed");
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        waited += 1;
    }
    assert_eq!(engine.store().load().unwrap().version.to_string(), "1.0.1");
}
