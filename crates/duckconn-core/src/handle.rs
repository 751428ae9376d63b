//! Engine seams: the driver that opens handles and the handle itself

use crate::errors::Result;
use crate::intent::IntentKind;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// One cell of a query result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Materialized result of one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First cell of the first row
    pub fn scalar(&self) -> Option<&CellValue> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// An open database handle
pub trait DatabaseHandle: Send {
    /// Run one statement and collect its rows.
    fn execute(&mut self, sql: &str) -> Result<QueryResult>;

    /// Run several `;`-separated statements, discarding results.
    fn execute_batch(&mut self, sql: &str) -> Result<()>;

    /// Install and load an extension. Loading an already loaded one is a no-op.
    fn load_extension(&mut self, name: &str) -> Result<()>;

    fn loaded_extensions(&self) -> BTreeSet<String>;

    /// Release the handle. Further calls fail with `ConnectionClosed`.
    fn close(&mut self) -> Result<()>;
}

/// Opens handles for each intent kind
pub trait Driver: Send + Sync {
    fn open_in_memory(&self) -> Result<Box<dyn DatabaseHandle>>;

    fn open_file(&self, path: &Path) -> Result<Box<dyn DatabaseHandle>>;

    fn open_managed(&self, database: &str, token: &str) -> Result<Box<dyn DatabaseHandle>>;

    /// Extensions loaded once after opening a handle of `kind`.
    fn transport_extensions(&self, kind: IntentKind) -> Vec<String> {
        match kind {
            IntentKind::ManagedCloud => vec!["motherduck".to_string()],
            IntentKind::InMemory | IntentKind::File => Vec::new(),
        }
    }
}
