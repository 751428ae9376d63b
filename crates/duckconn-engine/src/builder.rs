//! Connection build pipeline
//!
//! ## Phases (in order):
//! 1. Resolution: validate the raw mapping, resolve the effective target
//! 2. Connect: open a handle through the factory
//! 3. Bootstrap: materialize the configured source, at most once per target
//!
//! Each phase is timed and bracketed by `log_op_*` events. A failed build
//! returns an `ExError` carrying the build id, the target key when known
//! and the metrics recorded up to the failure.

use crate::connection::Connection;
use crate::Result;
use duckconn_core::bootstrap::{
    BootstrapController, BootstrapPolicy, BootstrapRecord, BootstrapRegistry,
};
use duckconn_core::config::{
    missing_token, token_fingerprint, validate, Configuration, CredentialSource,
};
use duckconn_core::errors::{ConnError, ExError};
use duckconn_core::factory::ConnectionFactory;
use duckconn_core::fetch::RemoteFetcher;
use duckconn_core::handle::{DatabaseHandle, Driver};
use duckconn_core::intent::{ConnectionIntent, IntentKind, TargetKey};
use duckconn_core::metrics::{ConnectionCounters, MetricsRecorder, Phase};
use duckconn_core::resolver::resolve;
use duckconn_core::{log_op_end, log_op_error, log_op_start};
use duckconn_core_types::schema::{OP_BOOTSTRAP, OP_BUILD, OP_CONNECT, OP_RESOLVE};
use duckconn_core_types::BuildId;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

struct Built {
    config: Configuration,
    key: TargetKey,
    handle: Box<dyn DatabaseHandle>,
    record: BootstrapRecord,
}

struct Failed {
    error: ConnError,
    key: Option<TargetKey>,
}

/// Runs the build pipeline against shared factory, registry and counters
pub struct ConnectionBuilder {
    factory: ConnectionFactory,
    bootstrap: BootstrapController,
    counters: Arc<ConnectionCounters>,
    credentials: Arc<dyn CredentialSource>,
    base_dir: Option<PathBuf>,
}

impl ConnectionBuilder {
    pub fn new(
        driver: Arc<dyn Driver>,
        fetcher: Arc<dyn RemoteFetcher>,
        registry: Arc<BootstrapRegistry>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let counters = Arc::new(ConnectionCounters::default());
        Self {
            factory: ConnectionFactory::new(driver),
            bootstrap: BootstrapController::new(registry, fetcher, counters.clone()),
            counters,
            credentials,
            base_dir: None,
        }
    }

    /// Resolve relative file targets against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_policy(mut self, policy: BootstrapPolicy) -> Self {
        self.bootstrap = self.bootstrap.with_policy(policy);
        self
    }

    pub fn registry(&self) -> &Arc<BootstrapRegistry> {
        self.bootstrap.registry()
    }

    pub fn counters(&self) -> &Arc<ConnectionCounters> {
        &self.counters
    }

    /// Build a connection named `name`.
    ///
    /// `target` overrides the mapping's `data_uri` when given.
    ///
    /// # Errors
    ///
    /// - `UnsupportedScheme` / `InvalidConfig` before any handle is opened
    /// - `StorageAccess`, `Authentication`, `Network` from the connect phase
    /// - `BootstrapFailure` from the bootstrap phase; the handle is closed
    pub fn build(
        &self,
        name: &str,
        target: Option<&str>,
        raw: &Map<String, Value>,
    ) -> Result<Connection> {
        let build_id = BuildId::new();
        let mut recorder = MetricsRecorder::new();
        self.counters.build_started();
        log_op_start!(OP_BUILD, connection = name, build_id = %build_id);

        let result = self.run(name, target, raw, &mut recorder);
        let snapshot = recorder.snapshot();
        let total_ms = snapshot.total_time_ms.unwrap_or_default();

        match result {
            Ok(Built {
                config,
                key,
                handle,
                record,
            }) => {
                self.counters.build_succeeded();
                log_op_end!(
                    OP_BUILD,
                    duration_ms = total_ms,
                    connection = name,
                    build_id = %build_id,
                    target_key = %key,
                    outcome = ?record.outcome,
                );
                Ok(Connection::new(name, key, config, handle, record, snapshot))
            }
            Err(Failed { error, key }) => {
                self.counters.build_failed();
                let mut ex = ExError::from(error)
                    .with_build_id(build_id.clone())
                    .with_metrics(snapshot);
                if let Some(key) = key {
                    ex = ex.with_target_key(key.as_str());
                }
                log_op_error!(
                    OP_BUILD,
                    ex.clone(),
                    duration_ms = total_ms,
                    connection = name,
                    build_id = %build_id,
                );
                Err(ex)
            }
        }
    }

    fn run(
        &self,
        name: &str,
        target: Option<&str>,
        raw: &Map<String, Value>,
        recorder: &mut MetricsRecorder,
    ) -> std::result::Result<Built, Failed> {
        let (config, intent) = timed(recorder, Phase::Resolution, OP_RESOLVE, name, || {
            self.resolve_phase(target, raw)
        })
        .map_err(|error| Failed { error, key: None })?;

        let key = TargetKey::derive(&intent);
        match intent.credential() {
            Some(token) => tracing::debug!(
                connection = %name,
                target_key = %key,
                intent_kind = %intent.kind(),
                token_fingerprint = %token_fingerprint(token),
                "target resolved"
            ),
            None => tracing::debug!(
                connection = %name,
                target_key = %key,
                intent_kind = %intent.kind(),
                "target resolved"
            ),
        }

        let mut handle = timed(recorder, Phase::Connect, OP_CONNECT, name, || {
            self.factory.create(&intent)
        })
        .map_err(|error| Failed {
            error,
            key: Some(key.clone()),
        })?;

        let bootstrapped = timed(recorder, Phase::Bootstrap, OP_BOOTSTRAP, name, || {
            self.bootstrap.bootstrap(handle.as_mut(), &config, &key)
        });

        match bootstrapped {
            Ok(record) => Ok(Built {
                config,
                key,
                handle,
                record,
            }),
            Err(error) => {
                if let Err(close_err) = handle.close() {
                    tracing::warn!(connection = %name, error = %close_err, "close after failed bootstrap");
                }
                Err(Failed {
                    error,
                    key: Some(key),
                })
            }
        }
    }

    fn resolve_phase(
        &self,
        target: Option<&str>,
        raw: &Map<String, Value>,
    ) -> duckconn_core::errors::Result<(Configuration, ConnectionIntent)> {
        let config = validate(raw, self.credentials.as_ref())?;
        let intent = match target.map(str::trim).filter(|t| !t.is_empty()) {
            Some(explicit) => resolve(Some(explicit))?,
            None => config.target.clone(),
        };
        // An explicit target may be managed even when data_uri is not
        if intent.kind() == IntentKind::ManagedCloud && config.motherduck_token.is_none() {
            return Err(ConnError::InvalidConfig {
                errors: vec![missing_token()],
            });
        }
        let intent = intent
            .with_credential(config.motherduck_token.clone())
            .rooted_at(self.base_dir.as_deref());
        Ok((config, intent))
    }
}

/// Time one phase and bracket it with start/end log events
fn timed<T>(
    recorder: &mut MetricsRecorder,
    phase: Phase,
    op: &'static str,
    connection: &str,
    f: impl FnOnce() -> duckconn_core::errors::Result<T>,
) -> duckconn_core::errors::Result<T> {
    log_op_start!(op, connection = connection);
    let (result, ms) = recorder.time(phase, f);
    match &result {
        Ok(_) => {
            log_op_end!(op, duration_ms = ms, connection = connection);
        }
        Err(e) => {
            log_op_error!(op, e.clone(), duration_ms = ms, connection = connection);
        }
    }
    result
}

impl std::fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("base_dir", &self.base_dir)
            .field("counters", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}
