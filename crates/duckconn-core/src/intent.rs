//! Typed connection intents and target keys

use duckconn_core_types::Sensitive;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Recognized extension for local database files
pub const FILE_EXTENSION: &str = ".duckdb";

/// The three supported connection targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    InMemory,
    File,
    ManagedCloud,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::InMemory => "in_memory",
            IntentKind::File => "file",
            IntentKind::ManagedCloud => "managed_cloud",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the factory should open
///
/// Produced by [`crate::resolver::resolve`] without a credential; the
/// builder attaches the managed-cloud token before handing it to the factory.
#[derive(Debug, Clone)]
pub enum ConnectionIntent {
    InMemory {
        name: String,
    },
    File {
        path: PathBuf,
    },
    ManagedCloud {
        database: String,
        credential: Option<Sensitive<String>>,
    },
}

impl ConnectionIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            ConnectionIntent::InMemory { .. } => IntentKind::InMemory,
            ConnectionIntent::File { .. } => IntentKind::File,
            ConnectionIntent::ManagedCloud { .. } => IntentKind::ManagedCloud,
        }
    }

    /// Path for files, database name for managed-cloud, alias for in-memory
    pub fn path_or_name(&self) -> String {
        match self {
            ConnectionIntent::InMemory { name } => name.clone(),
            ConnectionIntent::File { path } => path.display().to_string(),
            ConnectionIntent::ManagedCloud { database, .. } => database.clone(),
        }
    }

    pub fn credential(&self) -> Option<&Sensitive<String>> {
        match self {
            ConnectionIntent::ManagedCloud { credential, .. } => credential.as_ref(),
            _ => None,
        }
    }

    /// Attach a managed-cloud credential; other kinds are returned unchanged.
    pub fn with_credential(self, token: Option<Sensitive<String>>) -> Self {
        match self {
            ConnectionIntent::ManagedCloud { database, .. } => ConnectionIntent::ManagedCloud {
                database,
                credential: token,
            },
            other => other,
        }
    }

    /// Re-root a relative file path under `base_dir`.
    pub fn rooted_at(self, base_dir: Option<&Path>) -> Self {
        match (self, base_dir) {
            (ConnectionIntent::File { path }, Some(base)) if path.is_relative() => {
                ConnectionIntent::File {
                    path: base.join(path),
                }
            }
            (other, _) => other,
        }
    }
}

/// Normalized identifier used to deduplicate bootstrap attempts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(String);

impl TargetKey {
    /// Derive the key for an intent.
    ///
    /// Equivalent spellings of one target (`data.duckdb`, `./data.duckdb`,
    /// `file://data.duckdb`) map to the same key.
    pub fn derive(intent: &ConnectionIntent) -> Self {
        match intent {
            ConnectionIntent::InMemory { name } => Self(format!("memory://{}", name)),
            ConnectionIntent::File { path } => {
                Self(format!("file://{}", normalize_path(path).display()))
            }
            ConnectionIntent::ManagedCloud { database, .. } => {
                Self(format!("md:{}", database.to_ascii_lowercase()))
            }
        }
    }

    /// In-memory targets are a fresh database on every open.
    pub fn is_ephemeral(&self) -> bool {
        self.0.starts_with("memory://")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lexical normalization: drops `.` components and folds `..` where possible.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
