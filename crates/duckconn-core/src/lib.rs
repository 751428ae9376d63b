//! Connection lifecycle kernel
//!
//! Engine-agnostic pieces of a connection build:
//! resolve a target, validate configuration, open a handle through a
//! [`handle::Driver`], bootstrap a table from a remote source once per
//! target, and time every phase.

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod factory;
pub mod fetch;
pub mod handle;
pub mod intent;
pub mod logging_facility;
pub mod metrics;
pub mod naming;
pub mod resolver;

pub use bootstrap::{
    BootstrapController, BootstrapOutcome, BootstrapPolicy, BootstrapRecord, BootstrapRegistry,
    BootstrapState,
};
pub use config::{
    validate, validate_fields, Configuration, CreateTable, CredentialSource, ProcessEnv,
    StaticCredentials, Validation,
};
pub use errors::{ConnError, ExError, ExErrorKind, FieldError, Result};
pub use factory::ConnectionFactory;
pub use fetch::{Compression, FetchedSource, RemoteFetcher, RetryPolicy};
pub use handle::{CellValue, DatabaseHandle, Driver, QueryResult};
pub use intent::{ConnectionIntent, IntentKind, TargetKey};
pub use metrics::{ConnectionCounters, CounterSnapshot, MetricsRecorder, MetricsSnapshot, Phase};
pub use resolver::resolve;
