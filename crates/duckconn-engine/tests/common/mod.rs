#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use duckconn_core::{
    ConnError, DatabaseHandle, Driver, FetchedSource, RemoteFetcher, Result, StaticCredentials,
};
use duckconn_engine::ConnectionManager;
use duckconn_store::{DuckDbDriver, HttpFetcher};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// JSON object literal as a raw configuration mapping
pub fn raw(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

/// Write a small CSV and return its `file://` URL
pub fn sample_csv(dir: &Path) -> String {
    let path = dir.join("events.csv");
    std::fs::write(&path, "id,kind\n1,open\n2,close\n3,open\n").unwrap();
    Url::from_file_path(&path).unwrap().to_string()
}

/// Real fetcher that counts how often it is asked to fetch
pub struct CountingFetcher {
    inner: HttpFetcher,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(staging_dir: PathBuf) -> Self {
        Self {
            inner: HttpFetcher::new(staging_dir).direct(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteFetcher for CountingFetcher {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedSource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(url, timeout)
    }

    fn discard(&self, path: &Path) {
        self.inner.discard(path);
    }
}

/// DuckDB driver whose managed-cloud opens are rejected as unauthenticated,
/// and whose in-memory opens can be made to fail a number of times first
pub struct FlakyDriver {
    inner: DuckDbDriver,
    failures_left: AtomicUsize,
    pub opens: AtomicUsize,
}

impl FlakyDriver {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            inner: DuckDbDriver::new(),
            failures_left: AtomicUsize::new(n),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Driver for FlakyDriver {
    fn open_in_memory(&self) -> Result<Box<dyn DatabaseHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(ConnError::StorageAccess {
                path: ":memory:".to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        self.inner.open_in_memory()
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn DatabaseHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open_file(path)
    }

    fn open_managed(&self, database: &str, _token: &str) -> Result<Box<dyn DatabaseHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Err(ConnError::Authentication {
            database: database.to_string(),
            reason: "Invalid token".to_string(),
        })
    }

    fn transport_extensions(&self, _kind: duckconn_core::IntentKind) -> Vec<String> {
        Vec::new()
    }
}

/// Manager over the real DuckDB driver with a counting fetcher
pub fn duckdb_manager(dir: &Path) -> (ConnectionManager, Arc<CountingFetcher>) {
    let fetcher = Arc::new(CountingFetcher::new(dir.join("staging")));
    let manager = ConnectionManager::new(
        Arc::new(DuckDbDriver::new()),
        fetcher.clone(),
        Arc::new(StaticCredentials::none()),
    )
    .with_base_dir(dir);
    (manager, fetcher)
}
