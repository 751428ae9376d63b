#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use duckconn_core::{
    validate, CellValue, Compression, ConnError, Configuration, DatabaseHandle, FetchedSource,
    QueryResult, RemoteFetcher, Result, StaticCredentials,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Validate a JSON object literal with no ambient credentials
pub fn config(raw: Value) -> Configuration {
    match raw {
        Value::Object(map) => validate(&map, &StaticCredentials::none()).expect("valid config"),
        other => panic!("expected object, got {}", other),
    }
}

/// Tables visible to every handle opened on the same fake database
#[derive(Clone, Default)]
pub struct FakeDatabase {
    pub tables: Arc<Mutex<BTreeSet<String>>>,
}

impl FakeDatabase {
    pub fn with_table(name: &str) -> Self {
        let db = Self::default();
        db.tables.lock().unwrap().insert(name.to_string());
        db
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.lock().unwrap().contains(name)
    }

    /// Unqualified names resolve without regard to case
    pub fn has_table_ignoring_case(&self, name: &str) -> bool {
        self.tables
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }

    pub fn handle(&self) -> FakeHandle {
        FakeHandle {
            db: self.clone(),
            statements: Vec::new(),
            pending: None,
            fail_create: false,
            extensions: BTreeSet::new(),
            closed: false,
        }
    }
}

/// Records SQL and answers existence checks from the shared table set
pub struct FakeHandle {
    pub db: FakeDatabase,
    pub statements: Vec<String>,
    pending: Option<String>,
    pub fail_create: bool,
    extensions: BTreeSet<String>,
    pub closed: bool,
}

fn quoted(sql: &str, quote: char) -> Option<String> {
    let start = sql.find(quote)? + 1;
    let len = sql[start..].find(quote)?;
    Some(sql[start..start + len].to_string())
}

impl DatabaseHandle for FakeHandle {
    fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        self.statements.push(sql.to_string());
        if sql.contains("duckdb_tables()") {
            let table = quoted(sql, '\'').unwrap_or_default();
            let n = i64::from(self.db.has_table_ignoring_case(&table));
            return Ok(QueryResult {
                columns: vec!["count_star()".to_string()],
                rows: vec![vec![CellValue::Int(n)]],
            });
        }
        Ok(QueryResult::default())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());
        if sql.starts_with("CREATE") {
            if self.fail_create {
                return Err(ConnError::Query {
                    reason: "Invalid Input Error: could not sniff CSV".to_string(),
                });
            }
            self.pending = quoted(sql, '"');
        } else if sql == "COMMIT" {
            if let Some(table) = self.pending.take() {
                self.db.tables.lock().unwrap().insert(table);
            }
        } else if sql == "ROLLBACK" {
            self.pending = None;
        }
        Ok(())
    }

    fn load_extension(&mut self, name: &str) -> Result<()> {
        self.extensions.insert(name.to_string());
        Ok(())
    }

    fn loaded_extensions(&self) -> BTreeSet<String> {
        self.extensions.clone()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Counts fetch calls; optionally slow, optionally failing the first N calls
#[derive(Default)]
pub struct CountingFetcher {
    calls: AtomicUsize,
    discards: AtomicUsize,
    failures_left: AtomicUsize,
    failure: Option<ConnError>,
    delay: Duration,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Fail the first `n` calls with a network timeout
    pub fn failing_first(n: usize) -> Self {
        Self::failing_first_with(
            n,
            ConnError::Network {
                target: "https://x/y.csv".to_string(),
                reason: "operation timed out".to_string(),
            },
        )
    }

    pub fn failing_first_with(n: usize, error: ConnError) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

impl RemoteFetcher for CountingFetcher {
    fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedSource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
        }

        Ok(FetchedSource {
            path: PathBuf::from("/staging").join(url.path().trim_start_matches('/')),
            bytes: 42,
            compression: Compression::None,
            elapsed_ms: 1.0,
        })
    }

    fn discard(&self, _path: &Path) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }
}
