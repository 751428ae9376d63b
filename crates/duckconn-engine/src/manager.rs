//! Named-connection front door: builder plus cache

use crate::builder::ConnectionBuilder;
use crate::cache::{ConnectionCache, SharedConnection};
use crate::connection::Connection;
use crate::Result;
use duckconn_core::bootstrap::{BootstrapPolicy, BootstrapRegistry};
use duckconn_core::config::{CredentialSource, ProcessEnv};
use duckconn_core::fetch::RemoteFetcher;
use duckconn_core::handle::Driver;
use duckconn_core::metrics::CounterSnapshot;
use duckconn_store::{DuckDbDriver, HttpFetcher};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Builds connections on first request and hands out the cached one after
pub struct ConnectionManager {
    builder: ConnectionBuilder,
    cache: ConnectionCache,
}

impl ConnectionManager {
    pub fn new(
        driver: Arc<dyn Driver>,
        fetcher: Arc<dyn RemoteFetcher>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            builder: ConnectionBuilder::new(
                driver,
                fetcher,
                Arc::new(BootstrapRegistry::new()),
                credentials,
            ),
            cache: ConnectionCache::new(),
        }
    }

    /// DuckDB driver, HTTP fetcher staging under `staging_dir`, token from
    /// the process environment
    pub fn with_duckdb(staging_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(DuckDbDriver::new()),
            Arc::new(HttpFetcher::new(staging_dir)),
            Arc::new(ProcessEnv),
        )
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.builder = self.builder.with_base_dir(dir);
        self
    }

    pub fn with_policy(mut self, policy: BootstrapPolicy) -> Self {
        self.builder = self.builder.with_policy(policy);
        self
    }

    /// Cached connection for `name`, built from `raw` on first request.
    ///
    /// # Errors
    ///
    /// Any build error; nothing is cached when the build fails.
    pub fn connect(
        &self,
        name: &str,
        target: Option<&str>,
        raw: &Map<String, Value>,
    ) -> Result<SharedConnection> {
        self.cache
            .get_or_create(name, || self.builder.build(name, target, raw))
    }

    /// Build a fresh connection, bypassing the cache.
    ///
    /// # Errors
    ///
    /// See [`ConnectionBuilder::build`].
    pub fn build(
        &self,
        name: &str,
        target: Option<&str>,
        raw: &Map<String, Value>,
    ) -> Result<Connection> {
        self.builder.build(name, target, raw)
    }

    /// Evict and close the cached connection for `name`
    pub fn disconnect(&self, name: &str) -> bool {
        self.cache.remove(name)
    }

    pub fn registry(&self) -> &Arc<BootstrapRegistry> {
        self.builder.registry()
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.builder.counters().snapshot()
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("builder", &self.builder)
            .field("cache", &self.cache)
            .finish()
    }
}
