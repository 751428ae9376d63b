//! Subcommands

pub mod check;
pub mod list;
pub mod query;
pub mod tables;

use duckconn_engine::{ConnectionManager, SecretsFile};
use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug)]
pub struct Context {
    pub secrets: PathBuf,
    pub staging_dir: PathBuf,
}

impl Context {
    pub fn load_secrets(&self) -> Result<SecretsFile, Box<dyn std::error::Error>> {
        Ok(SecretsFile::load(&self.secrets)?)
    }

    /// DuckDB-backed manager rooted at the secrets file's directory
    pub fn manager(&self, secrets: &SecretsFile) -> ConnectionManager {
        let manager = ConnectionManager::with_duckdb(&self.staging_dir);
        match secrets.base_dir() {
            Some(dir) => manager.with_base_dir(dir),
            None => manager,
        }
    }
}
