//! Declarative connection configuration and its validator
//!
//! Validation is total: every violated constraint is collected into a
//! `FieldError` and reported together, so an operator fixes a secrets entry
//! in one pass instead of one error at a time.

use crate::errors::{ConnError, FieldError, Result};
use crate::fetch::RetryPolicy;
use crate::intent::{ConnectionIntent, IntentKind};
use crate::naming::{default_table_name, is_identifier};
use crate::resolver::resolve;
use base64::Engine;
use duckconn_core_types::Sensitive;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

/// Environment variable consulted when no token is configured
pub const ENV_MOTHERDUCK_TOKEN: &str = "MOTHERDUCK_TOKEN";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_MS: u64 = 250;
pub const MAX_FETCH_RETRIES: u64 = 10;

const KNOWN_KEYS: &[&str] = &[
    "data_uri",
    "source_url",
    "create_table",
    "motherduck_token",
    "description",
    "default_query",
    "timeout_ms",
    "fetch_retries",
    "fetch_backoff_ms",
    "skip_bootstrap",
    "force_refresh",
];

/// Where a managed-cloud credential comes from when the mapping has none
pub trait CredentialSource: Send + Sync {
    fn motherduck_token(&self) -> Option<String>;
}

/// Reads `MOTHERDUCK_TOKEN` from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl CredentialSource for ProcessEnv {
    fn motherduck_token(&self) -> Option<String> {
        std::env::var(ENV_MOTHERDUCK_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Fixed credential, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<Sensitive<String>>);

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(Sensitive::new(token.into())))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn motherduck_token(&self) -> Option<String> {
        self.0.as_ref().map(|t| t.expose().clone())
    }
}

/// Whether, and under which name, a remote source is materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTable {
    Disabled,
    DefaultName,
    Named(String),
}

impl CreateTable {
    pub fn is_requested(&self) -> bool {
        !matches!(self, CreateTable::Disabled)
    }
}

/// Validated, read-only connection configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    pub data_uri: String,
    /// `data_uri` resolved, without credential
    pub target: ConnectionIntent,
    pub source_url: Option<Url>,
    pub create_table: CreateTable,
    pub motherduck_token: Option<Sensitive<String>>,
    pub description: Option<String>,
    pub default_query: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub skip_bootstrap: bool,
    pub force_refresh: bool,
}

impl Configuration {
    /// True when a remote source should be materialized on connect
    pub fn bootstrap_requested(&self) -> bool {
        !self.skip_bootstrap && self.source_url.is_some() && self.create_table.is_requested()
    }

    /// Table the remote source lands in
    pub fn table_name(&self) -> Option<String> {
        match (&self.create_table, &self.source_url) {
            (CreateTable::Named(name), _) => Some(name.clone()),
            (CreateTable::DefaultName, Some(url)) => Some(default_table_name(url)),
            _ => None,
        }
    }

    /// The configured target with the credential attached
    pub fn intent(&self) -> ConnectionIntent {
        self.target.clone().with_credential(self.motherduck_token.clone())
    }
}

/// Outcome of field-level validation
#[derive(Debug, Clone)]
pub enum Validation {
    Valid(Box<Configuration>),
    Invalid(Vec<FieldError>),
}

impl Validation {
    pub fn into_result(self) -> Result<Configuration> {
        match self {
            Validation::Valid(config) => Ok(*config),
            Validation::Invalid(errors) => Err(ConnError::InvalidConfig { errors }),
        }
    }
}

/// Validate a raw mapping, collecting every violated constraint.
pub fn validate_fields(raw: &Map<String, Value>, credentials: &dyn CredentialSource) -> Validation {
    let mut errors = Vec::new();

    for key in raw.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
        tracing::debug!(key = %key, "ignoring unknown configuration key");
    }

    let data_uri = match raw.get("data_uri") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("data_uri", "is required"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new("data_uri", "must be a string"));
            None
        }
    };

    let target = data_uri.as_deref().and_then(|uri| match resolve(Some(uri)) {
        Ok(intent) => Some(intent),
        Err(_) => {
            errors.push(FieldError::new(
                "data_uri",
                format!(
                    "unsupported target '{}': expected memory://, *.duckdb, file://*.duckdb or md:<database>",
                    uri
                ),
            ));
            None
        }
    });

    let source_text = optional_string(raw, "source_url", &mut errors).filter(|s| !s.is_empty());
    let source_url = source_text.as_deref().and_then(|s| match Url::parse(s) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => Some(url),
        Ok(url) => {
            errors.push(FieldError::new(
                "source_url",
                format!("unsupported scheme '{}': expected http, https or file", url.scheme()),
            ));
            None
        }
        Err(e) => {
            errors.push(FieldError::new(
                "source_url",
                format!("is not a valid URL: {}", e),
            ));
            None
        }
    });

    let create_table = match raw.get("create_table") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => CreateTable::Disabled,
        Some(Value::Bool(true)) => CreateTable::DefaultName,
        Some(Value::String(s)) if s.trim().is_empty() => CreateTable::Disabled,
        Some(Value::String(s)) => {
            let name = s.trim();
            if is_identifier(name) {
                CreateTable::Named(name.to_string())
            } else {
                errors.push(FieldError::new(
                    "create_table",
                    format!("'{}' is not a valid table name", name),
                ));
                CreateTable::Disabled
            }
        }
        Some(_) => {
            errors.push(FieldError::new(
                "create_table",
                "must be a boolean or a table name",
            ));
            CreateTable::Disabled
        }
    };

    let create_table_invalid = errors.iter().any(|e| e.field == "create_table");
    if source_text.is_some() && !create_table.is_requested() && !create_table_invalid {
        errors.push(FieldError::new(
            "create_table",
            "must be true or a table name when source_url is set",
        ));
    }

    let motherduck_token = optional_string(raw, "motherduck_token", &mut errors)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| credentials.motherduck_token())
        .map(Sensitive::new);

    if target.as_ref().map(ConnectionIntent::kind) == Some(IntentKind::ManagedCloud)
        && motherduck_token.is_none()
    {
        errors.push(missing_token());
    }

    let description = optional_string(raw, "description", &mut errors);
    let default_query = optional_string(raw, "default_query", &mut errors);

    let timeout_ms = optional_u64(raw, "timeout_ms", &mut errors).unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        errors.push(FieldError::new("timeout_ms", "must be greater than zero"));
    }

    let retries = optional_u64(raw, "fetch_retries", &mut errors).unwrap_or(0);
    if retries > MAX_FETCH_RETRIES {
        errors.push(FieldError::new(
            "fetch_retries",
            format!("must be at most {}", MAX_FETCH_RETRIES),
        ));
    }
    let backoff_ms =
        optional_u64(raw, "fetch_backoff_ms", &mut errors).unwrap_or(DEFAULT_BACKOFF_MS);

    let skip_bootstrap = optional_bool(raw, "skip_bootstrap", &mut errors).unwrap_or(false);
    let force_refresh = optional_bool(raw, "force_refresh", &mut errors).unwrap_or(false);
    if skip_bootstrap && force_refresh {
        errors.push(FieldError::new(
            "force_refresh",
            "cannot be combined with skip_bootstrap",
        ));
    }

    match (data_uri, target) {
        (Some(data_uri), Some(target)) if errors.is_empty() => {
            Validation::Valid(Box::new(Configuration {
                data_uri,
                target,
                source_url,
                create_table,
                motherduck_token,
                description,
                default_query,
                timeout: Duration::from_millis(timeout_ms),
                retry: RetryPolicy {
                    max_attempts: retries.min(MAX_FETCH_RETRIES) as u32 + 1,
                    backoff: Duration::from_millis(backoff_ms),
                },
                skip_bootstrap,
                force_refresh,
            }))
        }
        _ => Validation::Invalid(errors),
    }
}

/// Validate a raw mapping, failing with one aggregated `InvalidConfig`.
///
/// # Errors
///
/// Returns `ConnError::InvalidConfig` listing every violated constraint.
pub fn validate(raw: &Map<String, Value>, credentials: &dyn CredentialSource) -> Result<Configuration> {
    validate_fields(raw, credentials).into_result()
}

/// Short, non-reversible token fingerprint that is safe to log
pub fn token_fingerprint(token: &Sensitive<String>) -> String {
    let digest = Sha256::digest(token.expose().as_bytes());
    let encoded = base64::engine::general_purpose::URL_SAFE.encode(digest);
    encoded.chars().take(16).collect()
}

/// The field error for a managed-cloud target with no token
pub fn missing_token() -> FieldError {
    FieldError::new(
        "motherduck_token",
        format!(
            "is required for managed-cloud targets (set motherduck_token or {})",
            ENV_MOTHERDUCK_TOKEN
        ),
    )
}

fn optional_string(
    raw: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match raw.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.push(FieldError::new(key, "must be a string"));
            None
        }
    }
}

fn optional_u64(raw: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<u64> {
    match raw.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => Some(v),
            None => {
                errors.push(FieldError::new(key, "must be a non-negative integer"));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new(key, "must be a non-negative integer"));
            None
        }
    }
}

fn optional_bool(raw: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<bool> {
    match raw.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.push(FieldError::new(key, "must be a boolean"));
            None
        }
    }
}
