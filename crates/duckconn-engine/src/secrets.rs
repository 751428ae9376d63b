//! Secrets file loader
//!
//! Reads a TOML file whose `[connections.<name>]` tables are the raw
//! configuration mappings:
//!
//! ```toml
//! [connections.events]
//! data_uri = "data/events.duckdb"
//! source_url = "https://example.org/events.csv.gz"
//! create_table = "events"
//! ```

use crate::Result;
use duckconn_core::errors::{ExError, ExErrorKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONNECTIONS_TABLE: &str = "connections";

#[derive(Debug, Clone, Default)]
pub struct SecretsFile {
    path: Option<PathBuf>,
    connections: BTreeMap<String, Map<String, Value>>,
}

impl SecretsFile {
    /// Load and parse a secrets file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Serialization` if it is not valid
    /// TOML or `connections` entries are not tables.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_secrets")
                .with_message(format!("{}: {}", path.display(), e))
        })?;
        let mut secrets = Self::parse(&text)?;
        secrets.path = Some(path.to_path_buf());
        Ok(secrets)
    }

    /// Parse secrets from TOML text.
    ///
    /// # Errors
    ///
    /// `Serialization` on malformed input.
    pub fn parse(text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text).map_err(|e| serialization(e.to_string()))?;

        let mut connections = BTreeMap::new();
        match table.get(CONNECTIONS_TABLE) {
            None => {}
            Some(toml::Value::Table(entries)) => {
                for (name, entry) in entries {
                    let mapping = match serde_json::to_value(entry) {
                        Ok(Value::Object(map)) => map,
                        Ok(_) => {
                            return Err(serialization(format!(
                                "connections.{} must be a table",
                                name
                            )))
                        }
                        Err(e) => return Err(serialization(e.to_string())),
                    };
                    connections.insert(name.clone(), mapping);
                }
            }
            Some(_) => return Err(serialization("connections must be a table".to_string())),
        }

        Ok(Self {
            path: None,
            connections,
        })
    }

    /// Names of configured connections, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Raw mapping for `name`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if no connection has that name.
    pub fn get(&self, name: &str) -> Result<&Map<String, Value>> {
        self.connections.get(name).ok_or_else(|| {
            let known = self.names().collect::<Vec<_>>().join(", ");
            ExError::new(ExErrorKind::InvalidConfig)
                .with_op("load_secrets")
                .with_message(format!(
                    "no connection named '{}' (configured: {})",
                    name,
                    if known.is_empty() { "none" } else { &known }
                ))
        })
    }

    /// Directory relative file targets resolve against
    pub fn base_dir(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
    }
}

fn serialization(message: String) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("load_secrets")
        .with_message(message)
}
