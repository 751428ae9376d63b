//! Get-or-create connection cache keyed by connection name

use crate::connection::Connection;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A cached connection; callers lock it for exclusive use
pub type SharedConnection = Arc<Mutex<Connection>>;

type Slot = Arc<Mutex<Option<SharedConnection>>>;

/// Caches one connection per name
///
/// Each name has its own slot lock: concurrent requests for the same name
/// wait for the first build, requests for other names do not.
#[derive(Default)]
pub struct ConnectionCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached connection for `name`, building it on first use.
    ///
    /// `build` runs at most once per name while a connection is cached. A
    /// failed build caches nothing, so the next request builds again.
    ///
    /// # Errors
    ///
    /// Whatever `build` returns.
    pub fn get_or_create<F>(&self, name: &str, build: F) -> Result<SharedConnection>
    where
        F: FnOnce() -> Result<Connection>,
    {
        let slot = self.slot(name);
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = cached.as_ref() {
            tracing::debug!(connection = %name, "connection cache hit");
            return Ok(conn.clone());
        }

        let conn = Arc::new(Mutex::new(build()?));
        *cached = Some(conn.clone());
        Ok(conn)
    }

    pub fn get(&self, name: &str) -> Option<SharedConnection> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(name).cloned()
        }?;
        let cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        cached.clone()
    }

    /// Evict and close the connection for `name`. Returns whether one was cached.
    pub fn remove(&self, name: &str) -> bool {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.remove(name)
        };
        match slot.and_then(|s| s.lock().unwrap_or_else(PoisonError::into_inner).take()) {
            Some(conn) => {
                close_shared(name, &conn);
                true
            }
            None => false,
        }
    }

    /// Evict and close every cached connection
    pub fn clear(&self) {
        let drained: Vec<(String, Slot)> = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.drain().collect()
        };
        for (name, slot) in drained {
            if let Some(conn) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                close_shared(&name, &conn);
            }
        }
    }

    /// Names with a live cached connection
    pub fn names(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots
                .iter()
                .map(|(name, slot)| (name.clone(), slot.clone()))
                .collect()
        };
        let mut names: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, name: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(name.to_string()).or_default().clone()
    }
}

fn close_shared(name: &str, conn: &SharedConnection) {
    let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = conn.close() {
        tracing::warn!(connection = %name, error = %e, "close on eviction failed");
    }
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache")
            .field("names", &self.names())
            .finish()
    }
}
