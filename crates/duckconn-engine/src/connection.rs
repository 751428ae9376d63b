//! The connection object handed to callers

use crate::Result;
use chrono::{DateTime, Utc};
use duckconn_core::bootstrap::BootstrapRecord;
use duckconn_core::config::Configuration;
use duckconn_core::errors::{ConnError, ExError, ExErrorKind};
use duckconn_core::handle::{DatabaseHandle, QueryResult};
use duckconn_core::intent::TargetKey;
use duckconn_core::metrics::{elapsed_ms, MetricsSnapshot};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Build timings plus usage counters for one connection
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetrics {
    pub build: MetricsSnapshot,
    pub connected_at: DateTime<Utc>,
    pub query_count: u64,
    pub last_query_ms: Option<f64>,
}

impl ConnectionMetrics {
    pub fn new(build: MetricsSnapshot) -> Self {
        Self {
            build,
            connected_at: Utc::now(),
            query_count: 0,
            last_query_ms: None,
        }
    }

    /// Resolution plus connect time of the build
    pub fn connection_time_ms(&self) -> Option<f64> {
        self.build.connection_time_ms()
    }
}

/// An open, bootstrapped connection
///
/// Owns its handle exclusively. The handle is released on [`Connection::close`]
/// or, failing that, on drop.
pub struct Connection {
    name: String,
    target_key: TargetKey,
    config: Configuration,
    handle: Option<Box<dyn DatabaseHandle>>,
    bootstrap: BootstrapRecord,
    metrics: ConnectionMetrics,
}

impl Connection {
    pub(crate) fn new(
        name: impl Into<String>,
        target_key: TargetKey,
        config: Configuration,
        handle: Box<dyn DatabaseHandle>,
        bootstrap: BootstrapRecord,
        build: MetricsSnapshot,
    ) -> Self {
        Self {
            name: name.into(),
            target_key,
            config,
            handle: Some(handle),
            bootstrap,
            metrics: ConnectionMetrics::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_key(&self) -> &TargetKey {
        &self.target_key
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn bootstrap_record(&self) -> &BootstrapRecord {
        &self.bootstrap
    }

    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Run one statement.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` after [`Connection::close`], `Query` if the engine
    /// rejects the statement.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let handle = self.handle.as_mut().ok_or_else(|| {
            ExError::from(ConnError::ConnectionClosed {
                name: self.name.clone(),
            })
        })?;

        let start = Instant::now();
        let result = handle.execute(sql);
        let ms = elapsed_ms(start);
        self.metrics.query_count += 1;
        self.metrics.last_query_ms = Some(ms);

        result.map_err(|e| ExError::from(e).with_target_key(self.target_key.as_str()))
    }

    /// Run the single statement stored in a SQL file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Connection::query`].
    pub fn query_file(&mut self, path: &Path) -> Result<QueryResult> {
        let sql = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("query_file")
                .with_message(format!("{}: {}", path.display(), e))
        })?;
        self.query(sql.trim().trim_end_matches(';'))
    }

    /// Release the handle. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if it refuses to close cleanly; the
    /// connection counts as closed either way.
    pub fn close(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(mut handle) => {
                tracing::debug!(connection = %self.name, "closing connection");
                handle.close().map_err(ExError::from)
            }
            None => Ok(()),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close() {
                tracing::warn!(connection = %self.name, error = %e, "close on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("target_key", &self.target_key)
            .field("closed", &self.is_closed())
            .field("bootstrap", &self.bootstrap)
            .field("metrics", &self.metrics)
            .finish()
    }
}
