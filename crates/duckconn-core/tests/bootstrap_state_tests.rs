#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{config, CountingFetcher, FakeDatabase};
use duckconn_core::{
    resolve, BootstrapController, BootstrapOutcome, BootstrapRegistry, BootstrapState, ConnError,
    ConnectionCounters, TargetKey,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn controller(fetcher: Arc<CountingFetcher>) -> (BootstrapController, Arc<ConnectionCounters>) {
    let counters = Arc::new(ConnectionCounters::default());
    let controller = BootstrapController::new(
        Arc::new(BootstrapRegistry::new()),
        fetcher,
        counters.clone(),
    );
    (controller, counters)
}

fn key_for(data_uri: &str) -> TargetKey {
    TargetKey::derive(&resolve(Some(data_uri)).unwrap())
}

fn events_config() -> serde_json::Value {
    json!({
        "data_uri": "file://data.duckdb",
        "source_url": "https://x/y.csv",
        "create_table": "events"
    })
}

#[test]
fn test_no_source_is_skipped_without_fetch() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, _) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let key = key_for("data.duckdb");

    let record = controller
        .bootstrap(&mut db.handle(), &config(json!({"data_uri": "data.duckdb"})), &key)
        .unwrap();

    assert_eq!(record.outcome, BootstrapOutcome::Skipped);
    assert!(!record.completed);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(controller.registry().state(&key), BootstrapState::Skipped);
}

#[test]
fn test_second_bootstrap_short_circuits() {
    // GIVEN a fresh file target with a remote source
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, counters) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let cfg = config(events_config());
    let key = key_for(&cfg.data_uri);

    // WHEN bootstrapping twice
    let first = controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();
    let second = controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();

    // THEN exactly one fetch happened and both records are identical
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(first.outcome, BootstrapOutcome::Materialized);
    assert_eq!(first.table_name.as_deref(), Some("events"));
    assert!(db.has_table("events"));
    assert_eq!(fetcher.discards(), 1);
    assert_eq!(counters.snapshot().bootstrap_short_circuits, 1);
}

#[test]
fn test_concurrent_first_connections_fetch_once() {
    let fetcher = Arc::new(CountingFetcher::slow(Duration::from_millis(100)));
    let (controller, _) = controller(fetcher.clone());
    let controller = Arc::new(controller);
    let db = FakeDatabase::default();
    let cfg = Arc::new(config(events_config()));
    let key = key_for(&cfg.data_uri);

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let controller = controller.clone();
            let cfg = cfg.clone();
            let key = key.clone();
            let mut handle = db.handle();
            thread::spawn(move || controller.bootstrap(&mut handle, &cfg, &key))
        })
        .collect();

    let records: Vec<_> = workers
        .into_iter()
        .map(|w| w.join().unwrap().unwrap())
        .collect();

    assert_eq!(fetcher.calls(), 1);
    assert!(records.iter().all(|r| r.completed));
    assert!(controller.registry().state(&key).is_completed());
}

#[test]
fn test_failure_then_retry_fetches_again() {
    let fetcher = Arc::new(CountingFetcher::failing_first(1));
    let (controller, counters) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let cfg = config(events_config());
    let key = key_for(&cfg.data_uri);

    let err = controller
        .bootstrap(&mut db.handle(), &cfg, &key)
        .unwrap_err();
    match &err {
        ConnError::BootstrapFailure { target_key, cause } => {
            assert_eq!(target_key, key.as_str());
            assert!(matches!(**cause, ConnError::Network { .. }));
        }
        other => panic!("expected BootstrapFailure, got {:?}", other),
    }
    assert!(matches!(
        controller.registry().state(&key),
        BootstrapState::Failed { attempts: 1, .. }
    ));
    assert!(!db.has_table("events"));

    let record = controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(record.attempts, 2);
    assert_eq!(counters.snapshot().bootstrap_failures, 1);
}

#[test]
fn test_existing_table_counts_as_completed() {
    // GIVEN a file that was bootstrapped by an earlier process
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, _) = controller(fetcher.clone());
    let db = FakeDatabase::with_table("events");
    let cfg = config(events_config());
    let key = key_for(&cfg.data_uri);

    let record = controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();

    assert_eq!(record.outcome, BootstrapOutcome::AlreadyPresent);
    assert!(record.completed);
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn test_force_refresh_replaces_table() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, _) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let cfg = config(events_config());
    let key = key_for(&cfg.data_uri);
    controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();

    let mut raw = events_config();
    raw["force_refresh"] = json!(true);
    let forced = config(raw);
    let mut handle = db.handle();
    let record = controller.bootstrap(&mut handle, &forced, &key).unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(record.outcome, BootstrapOutcome::Materialized);
    assert!(handle
        .statements
        .iter()
        .any(|s| s.starts_with("CREATE OR REPLACE TABLE \"events\"")));
}

#[test]
fn test_in_memory_targets_never_short_circuit() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, _) = controller(fetcher.clone());
    let cfg = config(json!({
        "data_uri": "memory://",
        "source_url": "https://x/y.csv",
        "create_table": true
    }));
    let key = key_for(&cfg.data_uri);

    for _ in 0..2 {
        let fresh = FakeDatabase::default();
        let record = controller.bootstrap(&mut fresh.handle(), &cfg, &key).unwrap();
        assert_eq!(record.table_name.as_deref(), Some("y"));
        assert!(fresh.has_table("y"));
    }
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn test_network_failures_retry_within_one_bootstrap() {
    let fetcher = Arc::new(CountingFetcher::failing_first(2));
    let (controller, counters) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let mut raw = events_config();
    raw["fetch_retries"] = json!(2);
    raw["fetch_backoff_ms"] = json!(0);
    let cfg = config(raw);
    let key = key_for(&cfg.data_uri);

    let record = controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(record.attempts, 1);
    assert_eq!(counters.snapshot().bootstrap_fetches, 3);
}

#[test]
fn test_non_network_failures_are_not_retried() {
    let fetcher = Arc::new(CountingFetcher::failing_first_with(
        1,
        ConnError::StorageAccess {
            path: "/staging".to_string(),
            reason: "read-only file system".to_string(),
        },
    ));
    let (controller, _) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let mut raw = events_config();
    raw["fetch_retries"] = json!(3);
    let cfg = config(raw);
    let key = key_for(&cfg.data_uri);

    assert!(controller.bootstrap(&mut db.handle(), &cfg, &key).is_err());
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_load_failure_rolls_back_and_discards() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, _) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let cfg = config(events_config());
    let key = key_for(&cfg.data_uri);

    let mut handle = db.handle();
    handle.fail_create = true;
    let err = controller.bootstrap(&mut handle, &cfg, &key).unwrap_err();

    assert!(matches!(err, ConnError::BootstrapFailure { .. }));
    assert!(handle.statements.iter().any(|s| s == "ROLLBACK"));
    assert!(!handle.statements.iter().any(|s| s == "COMMIT"));
    assert!(!db.has_table("events"));
    assert_eq!(fetcher.discards(), 1);
}

#[test]
fn test_reset_forces_next_bootstrap() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, _) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let cfg = config(events_config());
    let key = key_for(&cfg.data_uri);
    controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();

    controller.registry().reset(&key);
    db.tables.lock().unwrap().clear();
    controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();

    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn test_skip_flag_leaves_completed_state_alone() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (controller, _) = controller(fetcher.clone());
    let db = FakeDatabase::default();
    let cfg = config(events_config());
    let key = key_for(&cfg.data_uri);
    controller.bootstrap(&mut db.handle(), &cfg, &key).unwrap();

    let mut raw = events_config();
    raw["skip_bootstrap"] = json!(true);
    let record = controller
        .bootstrap(&mut db.handle(), &config(raw), &key)
        .unwrap();

    assert_eq!(record.outcome, BootstrapOutcome::Skipped);
    assert!(controller.registry().state(&key).is_completed());
}
