//! Bootstrap state machine
//!
//! ```text
//! NotStarted ──no source──▶ Skipped
//!     │
//!     ├──table exists──▶ Completed (AlreadyPresent)
//!     ├──fetch + load ok──▶ Completed (Materialized)
//!     └──any failure──────▶ Failed ──next call──▶ (as NotStarted)
//! ```
//!
//! `Completed` short-circuits later calls for the same key unless the call
//! forces a refresh or the key is ephemeral (in-memory).

use super::registry::{BootstrapOutcome, BootstrapRecord, BootstrapRegistry, BootstrapState};
use crate::config::Configuration;
use crate::errors::{ConnError, Result};
use crate::fetch::{FetchedSource, RemoteFetcher, RetryPolicy};
use crate::handle::{CellValue, DatabaseHandle};
use crate::intent::TargetKey;
use crate::metrics::ConnectionCounters;
use crate::naming::{quote_identifier, quote_literal};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use url::Url;

/// `{table}` is replaced by the quoted table name.
///
/// Scoped to the default catalog and schema, matching names without regard
/// to case, the same way an unqualified `CREATE TABLE` resolves them.
pub const DEFAULT_EXISTS_SQL: &str = "SELECT count(*) FROM duckdb_tables() \
     WHERE database_name = current_database() \
     AND schema_name = current_schema() \
     AND lower(table_name) = lower({table})";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPolicy {
    /// Must return a single integer cell, non-zero when the table exists
    pub exists_sql: String,
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        Self {
            exists_sql: DEFAULT_EXISTS_SQL.to_string(),
        }
    }
}

impl BootstrapPolicy {
    pub fn exists_query(&self, table: &str) -> String {
        self.exists_sql.replace("{table}", &quote_literal(table))
    }
}

pub struct BootstrapController {
    registry: Arc<BootstrapRegistry>,
    fetcher: Arc<dyn RemoteFetcher>,
    counters: Arc<ConnectionCounters>,
    policy: BootstrapPolicy,
}

impl BootstrapController {
    pub fn new(
        registry: Arc<BootstrapRegistry>,
        fetcher: Arc<dyn RemoteFetcher>,
        counters: Arc<ConnectionCounters>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            counters,
            policy: BootstrapPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BootstrapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<BootstrapRegistry> {
        &self.registry
    }

    /// Bring `handle` to the bootstrapped state `config` asks for.
    ///
    /// Holds the slot lock for `key` for the whole attempt, so a concurrent
    /// caller for the same key waits and then observes the outcome.
    ///
    /// # Errors
    ///
    /// `BootstrapFailure` wrapping the fetch, existence check or load error. The key
    /// is left `Failed` and the next call retries.
    pub fn bootstrap(
        &self,
        handle: &mut dyn DatabaseHandle,
        config: &Configuration,
        key: &TargetKey,
    ) -> Result<BootstrapRecord> {
        let slot = self.registry.slot(key);
        let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let (url, table) = match (&config.source_url, config.table_name()) {
            (Some(url), Some(table)) if config.bootstrap_requested() => (url, table),
            _ => {
                if matches!(*state, BootstrapState::NotStarted | BootstrapState::Failed { .. }) {
                    *state = BootstrapState::Skipped;
                }
                tracing::debug!(target_key = %key, "no bootstrap requested");
                return Ok(BootstrapRecord::skipped(key.clone()));
            }
        };

        if let BootstrapState::Completed(record) = &*state {
            let same_table = record.table_name.as_deref() == Some(table.as_str());
            if same_table && !config.force_refresh && !key.is_ephemeral() {
                self.counters.bootstrap_short_circuited();
                tracing::debug!(target_key = %key, table = %table, "bootstrap already completed");
                return Ok(record.clone());
            }
        }

        let attempts = match &*state {
            BootstrapState::Failed { attempts, .. } => attempts + 1,
            _ => 1,
        };

        match self.run(handle, config, url, &table) {
            Ok(outcome) => {
                if outcome == BootstrapOutcome::AlreadyPresent {
                    self.counters.bootstrap_short_circuited();
                }
                let record = BootstrapRecord {
                    target_key: key.clone(),
                    completed: true,
                    table_name: Some(table),
                    outcome,
                    attempts,
                };
                *state = BootstrapState::Completed(record.clone());
                Ok(record)
            }
            Err(cause) => {
                self.counters.bootstrap_failed();
                tracing::warn!(
                    target_key = %key,
                    attempts,
                    error = %cause,
                    "bootstrap failed; next connection will retry"
                );
                *state = BootstrapState::Failed {
                    attempts,
                    last_error: cause.to_string(),
                };
                Err(ConnError::BootstrapFailure {
                    target_key: key.to_string(),
                    cause: Box::new(cause),
                })
            }
        }
    }

    fn run(
        &self,
        handle: &mut dyn DatabaseHandle,
        config: &Configuration,
        url: &Url,
        table: &str,
    ) -> Result<BootstrapOutcome> {
        if !config.force_refresh && self.table_exists(handle, table)? {
            tracing::debug!(table = %table, "table already present, skipping fetch");
            return Ok(BootstrapOutcome::AlreadyPresent);
        }

        let source = self.fetch_with_retry(url, config.timeout, config.retry)?;
        tracing::info!(
            table = %table,
            bytes = source.bytes,
            compression = ?source.compression,
            fetch_ms = source.elapsed_ms,
            "source staged"
        );

        let loaded = materialize(handle, table, &source, config.force_refresh);
        self.fetcher.discard(&source.path);
        loaded.map(|()| BootstrapOutcome::Materialized)
    }

    fn table_exists(&self, handle: &mut dyn DatabaseHandle, table: &str) -> Result<bool> {
        let result = handle.execute(&self.policy.exists_query(table))?;
        Ok(matches!(result.scalar(), Some(CellValue::Int(n)) if *n > 0))
    }

    fn fetch_with_retry(
        &self,
        url: &Url,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<FetchedSource> {
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            self.counters.bootstrap_fetched();
            match self.fetcher.fetch(url, timeout) {
                Ok(source) => return Ok(source),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    attempt += 1;
                    let delay = retry.delay_before(attempt);
                    tracing::warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "fetch failed, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for BootstrapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapController")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Load the staged file in one transaction; nothing is left behind on failure.
fn materialize(
    handle: &mut dyn DatabaseHandle,
    table: &str,
    source: &FetchedSource,
    replace: bool,
) -> Result<()> {
    let create = if replace {
        "CREATE OR REPLACE TABLE"
    } else {
        "CREATE TABLE"
    };
    let sql = format!(
        "{} {} AS SELECT * FROM {}",
        create,
        quote_identifier(table),
        quote_literal(&source.path.to_string_lossy())
    );

    handle.execute_batch("BEGIN TRANSACTION")?;
    match handle.execute_batch(&sql) {
        Ok(()) => handle.execute_batch("COMMIT"),
        Err(e) => {
            handle.execute_batch("ROLLBACK").ok();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exists_query_quotes_table_name() {
        let policy = BootstrapPolicy::default();
        let sql = policy.exists_query("o'brien");
        assert!(sql.ends_with("lower(table_name) = lower('o''brien')"));
        assert!(sql.contains("schema_name = current_schema()"));
    }

    #[test]
    fn test_custom_exists_template() {
        let policy = BootstrapPolicy {
            exists_sql: "SELECT count(*) FROM information_schema.tables WHERE table_name = {table}"
                .to_string(),
        };
        assert!(policy.exists_query("events").contains("information_schema.tables"));
    }
}
