//! `DatabaseHandle` over a DuckDB connection

use crate::errors::{query_error, Result};
use duckconn_core::errors::ConnError;
use duckconn_core::handle::{CellValue, DatabaseHandle, QueryResult};
use duckdb::types::Value;
use duckdb::Connection;
use std::collections::BTreeSet;

pub struct DuckDbHandle {
    conn: Option<Connection>,
    label: String,
    extensions: BTreeSet<String>,
}

impl DuckDbHandle {
    /// Wrap an open connection; `label` names it in errors
    pub fn new(conn: Connection, label: impl Into<String>) -> Self {
        Self {
            conn: Some(conn),
            label: label.into(),
            extensions: BTreeSet::new(),
        }
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| ConnError::ConnectionClosed {
            name: self.label.clone(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }
}

impl DatabaseHandle for DuckDbHandle {
    fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_error)?;
        let mut rows = stmt.query([]).map_err(query_error)?;

        let columns = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            let cells = (0..columns.len())
                .map(|i| row.get::<_, Value>(i).map(to_cell))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(query_error)?;
            out.push(cells);
        }

        Ok(QueryResult { columns, rows: out })
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql).map_err(query_error)
    }

    fn load_extension(&mut self, name: &str) -> Result<()> {
        if self.extensions.contains(name) {
            return Ok(());
        }
        self.execute_batch(&format!("INSTALL {name}; LOAD {name};"))?;
        tracing::debug!(extension = %name, connection = %self.label, "extension loaded");
        self.extensions.insert(name.to_string());
        Ok(())
    }

    fn loaded_extensions(&self) -> BTreeSet<String> {
        self.extensions.clone()
    }

    fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| ConnError::Internal {
                message: format!("closing {}: {}", self.label, e),
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DuckDbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbHandle")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .field("extensions", &self.extensions)
            .finish()
    }
}

fn to_cell(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Boolean(b) => CellValue::Bool(b),
        Value::TinyInt(i) => CellValue::Int(i.into()),
        Value::SmallInt(i) => CellValue::Int(i.into()),
        Value::Int(i) => CellValue::Int(i.into()),
        Value::BigInt(i) => CellValue::Int(i),
        Value::UTinyInt(i) => CellValue::Int(i.into()),
        Value::USmallInt(i) => CellValue::Int(i.into()),
        Value::UInt(i) => CellValue::Int(i.into()),
        Value::UBigInt(i) => i64::try_from(i)
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::Text(i.to_string())),
        Value::HugeInt(i) => i64::try_from(i)
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::Text(i.to_string())),
        Value::Float(x) => CellValue::Float(x.into()),
        Value::Double(x) => CellValue::Float(x),
        Value::Text(s) | Value::Enum(s) => CellValue::Text(s),
        Value::Blob(b) => CellValue::Blob(b),
        other => CellValue::Text(format!("{:?}", other)),
    }
}
