//! URI scheme resolver
//!
//! | Form | Kind |
//! |---|---|
//! | none, `""`, `:memory:`, `memory`, `memory://...` | InMemory |
//! | `*.duckdb`, `file://*.duckdb` | File |
//! | `md:name`, `md://name` | ManagedCloud |
//!
//! Everything else is rejected with `ConnError::UnsupportedScheme`.

use crate::errors::{ConnError, Result};
use crate::intent::{ConnectionIntent, FILE_EXTENSION};
use std::path::PathBuf;

const MEMORY_SCHEME: &str = "memory://";
const FILE_SCHEME: &str = "file://";
const MANAGED_SCHEME: &str = "md://";
const MANAGED_PREFIX: &str = "md:";

/// Resolve a target identifier into a typed connection intent.
///
/// Pure: no filesystem or network access.
pub fn resolve(target: Option<&str>) -> Result<ConnectionIntent> {
    let raw = target.unwrap_or_default();
    let input = raw.trim();

    if input.is_empty() || input == ":memory:" || input == "memory" {
        return Ok(ConnectionIntent::InMemory {
            name: String::new(),
        });
    }

    if let Some(name) = input.strip_prefix(MEMORY_SCHEME) {
        return Ok(ConnectionIntent::InMemory {
            name: name.to_string(),
        });
    }

    if let Some(database) = input
        .strip_prefix(MANAGED_SCHEME)
        .or_else(|| input.strip_prefix(MANAGED_PREFIX))
    {
        return Ok(ConnectionIntent::ManagedCloud {
            database: database.trim_end_matches('/').to_string(),
            credential: None,
        });
    }

    let path = input.strip_prefix(FILE_SCHEME).unwrap_or(input);
    if path.len() > FILE_EXTENSION.len()
        && path.ends_with(FILE_EXTENSION)
        && !has_foreign_scheme(path)
    {
        return Ok(ConnectionIntent::File {
            path: PathBuf::from(path),
        });
    }

    Err(ConnError::UnsupportedScheme {
        input: raw.to_string(),
    })
}

/// `https://host/x.duckdb` ends in the right extension but is not a local path.
fn has_foreign_scheme(path: &str) -> bool {
    path.split_once("://")
        .map(|(scheme, _)| {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        })
        .unwrap_or(false)
}
