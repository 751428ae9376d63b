//! Connection factory: turns an intent into an open, ready-to-query handle

use crate::errors::{ConnError, Result};
use crate::handle::{DatabaseHandle, Driver};
use crate::intent::ConnectionIntent;
use std::sync::Arc;

#[derive(Clone)]
pub struct ConnectionFactory {
    driver: Arc<dyn Driver>,
}

impl ConnectionFactory {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Open a handle for `intent` and load its transport extensions.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if a managed-cloud intent carries no credential
    /// - `StorageAccess` if a file cannot be opened or created
    /// - `Authentication` / `Network` for managed-cloud rejections
    ///
    /// A handle that opened but failed extension loading is closed before
    /// the error is returned.
    pub fn create(&self, intent: &ConnectionIntent) -> Result<Box<dyn DatabaseHandle>> {
        let mut handle = match intent {
            ConnectionIntent::InMemory { .. } => self.driver.open_in_memory()?,
            ConnectionIntent::File { path } => self.driver.open_file(path)?,
            ConnectionIntent::ManagedCloud {
                database,
                credential,
            } => {
                let token = credential.as_ref().ok_or_else(|| {
                    ConnError::invalid_field(
                        "motherduck_token",
                        "is required for managed-cloud targets",
                    )
                })?;
                self.driver.open_managed(database, token.expose())?
            }
        };

        for extension in self.driver.transport_extensions(intent.kind()) {
            if let Err(e) = handle.load_extension(&extension) {
                handle.close().ok();
                return Err(e);
            }
        }

        Ok(handle)
    }
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory").finish_non_exhaustive()
    }
}
