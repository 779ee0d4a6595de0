//! End-to-end flows driving the public API against the in-memory
//! tracking service.

use bitacora::{
    InMemoryTrackingClient, ModelFlavor, ModelPayload, ModelSelector, ModelVersion, RunLogger,
    RunStatus, Stage, TrackingClient, TrackingConfig, TrackingError,
};
use proptest::prelude::*;
use std::collections::HashMap;

const BOOSTED: &str = "tree-ensemble-boosting";

fn train_and_promote(
    client: &InMemoryTrackingClient,
    config: &TrackingConfig,
    model_name: &str,
    payload: &[u8],
    stage: Stage,
) -> String {
    let mut logger = RunLogger::new(client, config);
    logger.begin("/teams/fraud/churn").unwrap();
    logger
        .register_model(&ModelPayload::from_bytes(payload.to_vec()), BOOSTED, model_name)
        .unwrap();
    let promoted = logger.promote(model_name, stage).unwrap();
    logger.end().unwrap();
    promoted.version
}

#[test]
fn full_lifecycle_from_training_to_serving() {
    let client = InMemoryTrackingClient::new().with_user("ana");
    let config = TrackingConfig::default();

    // training side
    let mut logger = RunLogger::new(&client, &config);
    let run_id = logger.begin("/teams/fraud/churn").unwrap().run_id.clone();

    let mut metrics = HashMap::new();
    metrics.insert("auc".to_string(), 0.93);
    let mut params = HashMap::new();
    params.insert("date".to_string(), serde_json::json!("2022-01-01"));
    logger.record(&metrics, &params).unwrap();

    let registered = logger
        .register_model(
            &ModelPayload::from_bytes(b"churn-booster-v1".to_vec()),
            BOOSTED,
            "churn",
        )
        .unwrap();
    logger.promote("churn", Stage::Production).unwrap();
    let finished = logger.end().unwrap();

    assert_eq!(finished.status, RunStatus::Finished);
    assert_eq!(finished.metrics, metrics);
    assert_eq!(finished.params, params);

    // serving side
    let selector = ModelSelector::new(&client, "churn", BOOSTED).unwrap();
    let loaded = selector.load_latest(Some(Stage::Production)).unwrap();

    assert_eq!(loaded.version.version, registered.version);
    assert_eq!(loaded.version.run_id, run_id);
    assert_eq!(loaded.version.created_by, "ana");
    assert_eq!(loaded.payload.as_bytes(), b"churn-booster-v1");
}

#[test]
fn selection_over_versions_promoted_through_the_real_flow() {
    let client = InMemoryTrackingClient::new();
    let config = TrackingConfig::default();

    // three training runs leave versions 1, 2, 3 in Archived, Staging,
    // Production
    let v1 = train_and_promote(&client, &config, "churn", b"model-1", Stage::Archived);
    let v2 = train_and_promote(&client, &config, "churn", b"model-2", Stage::Staging);
    let v3 = train_and_promote(&client, &config, "churn", b"model-3", Stage::Production);
    assert_eq!((v1.as_str(), v2.as_str(), v3.as_str()), ("1", "2", "3"));

    let selector = ModelSelector::new(&client, "churn", BOOSTED).unwrap();

    let latest = selector.load_latest(None).unwrap();
    assert_eq!(latest.version.version, "3");
    assert_eq!(latest.payload.as_bytes(), b"model-3");

    let staging = selector.load_latest(Some(Stage::Staging)).unwrap();
    assert_eq!(staging.version.version, "2");

    let production = selector.load_latest(Some(Stage::Production)).unwrap();
    assert_eq!(production.version.version, "3");

    let by_version = selector.load_by_version("2").unwrap();
    assert_eq!(by_version.payload.as_bytes(), b"model-2");

    let err = selector.load_by_version("99").unwrap_err();
    assert!(matches!(err, TrackingError::NotFound { .. }));
}

#[test]
fn no_version_in_requested_stage_is_not_found() {
    let client = InMemoryTrackingClient::new();
    let config = TrackingConfig::default();
    train_and_promote(&client, &config, "churn", b"model-1", Stage::Staging);

    let selector = ModelSelector::new(&client, "churn", BOOSTED).unwrap();
    let err = selector.load_latest(Some(Stage::Production)).unwrap_err();
    assert!(matches!(err, TrackingError::NotFound { .. }));
}

#[test]
fn unsupported_flavor_is_rejected_on_both_sides_with_no_writes() {
    let client = InMemoryTrackingClient::new();
    let config = TrackingConfig::default();

    let mut logger = RunLogger::new(&client, &config);
    logger.begin("/teams/fraud/churn").unwrap();
    let err = logger
        .register_model(&ModelPayload::from_bytes(b"m".to_vec()), "pickle", "churn")
        .unwrap_err();
    assert_eq!(err, TrackingError::UnsupportedFlavor("pickle".to_string()));
    assert_eq!(client.artifact_count().unwrap(), 0);
    assert_eq!(client.version_count().unwrap(), 0);

    let err = ModelSelector::new(&client, "churn", "pickle").unwrap_err();
    assert_eq!(err, TrackingError::UnsupportedFlavor("pickle".to_string()));
}

#[test]
fn closed_session_reopens_with_a_fresh_run() {
    let client = InMemoryTrackingClient::new();
    let config = TrackingConfig::default();

    let mut logger = RunLogger::new(&client, &config);
    let first = logger.begin("/teams/fraud/churn").unwrap().run_id.clone();
    logger
        .register_model(&ModelPayload::from_bytes(b"m1".to_vec()), BOOSTED, "churn")
        .unwrap();
    logger.end().unwrap();

    assert_eq!(
        logger.promote("churn", Stage::Staging).unwrap_err(),
        TrackingError::SessionClosed
    );

    let second = logger.begin("/teams/fraud/churn").unwrap().run_id.clone();
    assert_ne!(first, second);

    // the fresh run has registered nothing yet, so promotion cannot
    // resolve a version even though the model exists
    let err = logger.promote("churn", Stage::Staging).unwrap_err();
    assert_eq!(
        err,
        TrackingError::VersionNotFound {
            model: "churn".to_string(),
            run_id: second,
        }
    );
}

#[test]
fn promotion_preserves_run_binding_across_stage_moves() {
    let client = InMemoryTrackingClient::new();
    let config = TrackingConfig::default();

    let mut logger = RunLogger::new(&client, &config);
    let run_id = logger.begin("/teams/fraud/churn").unwrap().run_id.clone();
    logger
        .register_model(&ModelPayload::from_bytes(b"m1".to_vec()), BOOSTED, "churn")
        .unwrap();

    for stage in [Stage::Staging, Stage::Production, Stage::Archived, Stage::None] {
        let promoted = logger.promote("churn", stage).unwrap();
        assert_eq!(promoted.stage, stage);
        assert_eq!(promoted.run_id, run_id);
    }
}

// ============================================================================
// Properties
// ============================================================================

fn metric_map() -> impl Strategy<Value = HashMap<String, f64>> {
    prop::collection::hash_map("[a-z][a-z0-9_]{0,11}", -1e9f64..1e9f64, 1..8)
}

fn param_map() -> impl Strategy<Value = HashMap<String, serde_json::Value>> {
    prop::collection::hash_map(
        "[a-z][a-z0-9_]{0,11}",
        "[a-zA-Z0-9 _.:-]{0,16}".prop_map(serde_json::Value::String),
        1..8,
    )
}

proptest! {
    /// PROPERTY: after record(M, _) and session end, the run's logged
    /// metrics are exactly M
    #[test]
    fn prop_recorded_metrics_read_back_exactly(metrics in metric_map()) {
        let client = InMemoryTrackingClient::new();
        let config = TrackingConfig::default();
        let mut logger = RunLogger::new(&client, &config);
        let run_id = logger.begin("/teams/props").unwrap().run_id.clone();

        logger.record(&metrics, &HashMap::new()).unwrap();
        logger.end().unwrap();

        let run = client.get_run(&run_id).unwrap();
        prop_assert_eq!(run.metrics, metrics);
        prop_assert!(run.params.is_empty());
    }

    /// PROPERTY: after record(_, P) and session end, the run's logged
    /// params are exactly P
    #[test]
    fn prop_recorded_params_read_back_exactly(params in param_map()) {
        let client = InMemoryTrackingClient::new();
        let config = TrackingConfig::default();
        let mut logger = RunLogger::new(&client, &config);
        let run_id = logger.begin("/teams/props").unwrap().run_id.clone();

        logger.record(&HashMap::new(), &params).unwrap();
        logger.end().unwrap();

        let run = client.get_run(&run_id).unwrap();
        prop_assert_eq!(run.params, params);
        prop_assert!(run.metrics.is_empty());
    }

    /// PROPERTY: re-recording a key overwrites it, keeping the last
    /// value written
    #[test]
    fn prop_rerecorded_metric_keeps_last_value(first in -1e9f64..1e9f64, second in -1e9f64..1e9f64) {
        let client = InMemoryTrackingClient::new();
        let config = TrackingConfig::default();
        let mut logger = RunLogger::new(&client, &config);
        let run_id = logger.begin("/teams/props").unwrap().run_id.clone();

        let mut metrics = HashMap::new();
        metrics.insert("auc".to_string(), first);
        logger.record(&metrics, &HashMap::new()).unwrap();
        metrics.insert("auc".to_string(), second);
        logger.record(&metrics, &HashMap::new()).unwrap();

        let run = client.get_run(&run_id).unwrap();
        prop_assert_eq!(run.metrics.get("auc"), Some(&second));
    }

    /// PROPERTY: whatever order versions were created in, load_latest
    /// picks the numerically largest
    #[test]
    fn prop_load_latest_picks_numeric_max(mut numbers in prop::collection::vec(1u64..500, 1..12)) {
        numbers.sort_unstable();
        numbers.dedup();

        let client = InMemoryTrackingClient::new();
        let max = *numbers.last().unwrap();
        // reversed insertion order: highest version is created first
        for number in numbers.iter().rev() {
            let source = format!("mem://registry/churn/{}", number);
            client
                .seed_version(ModelVersion::new(
                    "churn",
                    number.to_string(),
                    format!("run-{}", number),
                    source.clone(),
                ))
                .unwrap();
            client
                .seed_artifact(
                    source,
                    ModelFlavor::TreeEnsembleBoosting,
                    ModelPayload::from_bytes(number.to_be_bytes().to_vec()),
                )
                .unwrap();
        }

        let selector = ModelSelector::new(&client, "churn", BOOSTED).unwrap();
        let loaded = selector.load_latest(None).unwrap();
        prop_assert_eq!(loaded.version.version, max.to_string());
    }
}
