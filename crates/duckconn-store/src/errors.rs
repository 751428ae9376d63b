//! Error helpers for duckconn-store
//!
//! Map engine, filesystem and HTTP failures onto core `ConnError` kinds

use duckconn_core::errors::ConnError;
use std::fmt::Display;
use std::path::Path;
use url::Url;

pub use duckconn_core::errors::Result;

/// Message fragments the managed service uses when it rejects a credential
const AUTH_MARKERS: &[&str] = &[
    "token",
    "unauthenticated",
    "unauthorized",
    "authentication",
    "401",
    "403",
    "permission denied",
];

/// Create a query error from duckdb::Error
pub fn query_error(err: duckdb::Error) -> ConnError {
    ConnError::Query {
        reason: err.to_string(),
    }
}

/// Create a storage access error for a database or staging path
pub fn storage_access(path: &Path, reason: impl Display) -> ConnError {
    ConnError::StorageAccess {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Create an IO error tagged with the operation that failed
pub fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ConnError {
    storage_access(path, format!("{}: {}", operation, err))
}

/// Create a network error from a failed request
pub fn network_error(url: &Url, err: reqwest::Error) -> ConnError {
    let reason = if err.is_timeout() {
        format!("timed out: {}", err)
    } else if let Some(status) = err.status() {
        format!("HTTP {}", status)
    } else {
        err.to_string()
    };
    ConnError::Network {
        target: url.to_string(),
        reason,
    }
}

/// Split a managed-cloud open failure into `Authentication` or `Network`
pub fn classify_managed_error(database: &str, err: duckdb::Error) -> ConnError {
    classify_managed_message(database, &err.to_string())
}

pub(crate) fn classify_managed_message(database: &str, message: &str) -> ConnError {
    let lowered = message.to_ascii_lowercase();
    if AUTH_MARKERS.iter().any(|m| lowered.contains(m)) {
        ConnError::Authentication {
            database: database.to_string(),
            reason: message.to_string(),
        }
    } else {
        ConnError::Network {
            target: format!("md:{}", database),
            reason: message.to_string(),
        }
    }
}
