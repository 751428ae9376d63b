//! DuckDB connection opening

use crate::errors::{classify_managed_error, io_error, storage_access, Result};
use duckdb::{Config, Connection};
use std::fs;
use std::path::Path;

/// DuckDB config key carrying the managed-service credential
pub const MOTHERDUCK_TOKEN_KEY: &str = "motherduck_token";

/// Open a fresh in-memory database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| storage_access(Path::new(":memory:"), e))
}

/// Open or create a database file, creating parent directories as needed
pub fn open_file(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error("create_parent_dir", parent, e))?;
    }
    Connection::open(path).map_err(|e| storage_access(path, e))
}

/// Open a managed-cloud database with the token attached through config
pub fn open_managed(database: &str, token: &str) -> Result<Connection> {
    let config = Config::default()
        .with(MOTHERDUCK_TOKEN_KEY, token)
        .map_err(|e| classify_managed_error(database, e))?;
    Connection::open_with_flags(format!("md:{}", database), config)
        .map_err(|e| classify_managed_error(database, e))
}
