//! DuckDB implementation of the core `Driver` seam

use crate::db;
use crate::errors::Result;
use crate::handle::DuckDbHandle;
use duckconn_core::handle::{DatabaseHandle, Driver};
use duckconn_core::intent::IntentKind;
use std::path::Path;

/// Opens DuckDB handles for every target kind
#[derive(Debug, Clone, Default)]
pub struct DuckDbDriver {
    file_extensions: Vec<String>,
}

impl DuckDbDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extensions to load into every file-backed handle (e.g. `httpfs`)
    pub fn with_file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

impl Driver for DuckDbDriver {
    fn open_in_memory(&self) -> Result<Box<dyn DatabaseHandle>> {
        let conn = db::open_in_memory()?;
        Ok(Box::new(DuckDbHandle::new(conn, ":memory:")))
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn DatabaseHandle>> {
        let conn = db::open_file(path)?;
        tracing::debug!(path = %path.display(), "opened database file");
        Ok(Box::new(DuckDbHandle::new(conn, path.display().to_string())))
    }

    fn open_managed(&self, database: &str, token: &str) -> Result<Box<dyn DatabaseHandle>> {
        let conn = db::open_managed(database, token)?;
        Ok(Box::new(DuckDbHandle::new(conn, format!("md:{}", database))))
    }

    fn transport_extensions(&self, kind: IntentKind) -> Vec<String> {
        match kind {
            IntentKind::ManagedCloud => vec!["motherduck".to_string()],
            IntentKind::File => self.file_extensions.clone(),
            IntentKind::InMemory => Vec::new(),
        }
    }
}
