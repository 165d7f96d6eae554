//! Connection registry.
//!
//! One lazily opened session per database name. Each session sits in its own
//! async mutex slot, so statements against one database run one at a time
//! while other databases proceed independently.

use crate::db::connector::{Connector, Session};
use crate::db::types::RawRow;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use crate::sql::Statement;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, warn};

type Slot<S> = Arc<Mutex<Option<S>>>;

/// Owns every cached session, keyed by database name.
pub struct ConnectionRegistry<C: Connector> {
    connector: C,
    slots: RwLock<HashMap<String, Slot<C::Session>>>,
}

impl<C: Connector> ConnectionRegistry<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn dialect(&self) -> DatabaseType {
        self.connector.dialect()
    }

    /// Lock the slot for `database`, opening a session if none is cached.
    ///
    /// The returned handle holds the slot exclusively until dropped.
    pub async fn acquire(&self, database: &str) -> DbResult<ConnectionHandle<C::Session>> {
        let slot = self.slot(database).await;
        let mut guard = slot.lock_owned().await;

        if guard.is_none() {
            let session = self.connector.connect(database).await?;
            info!(database, "Opened connection");
            *guard = Some(session);
        }

        Ok(ConnectionHandle {
            database: database.to_string(),
            guard,
        })
    }

    async fn slot(&self, database: &str) -> Slot<C::Session> {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(database) {
                return Arc::clone(slot);
            }
        }

        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(database.to_string()).or_default())
    }

    /// Discard every cached session.
    ///
    /// Idle sessions are closed; sessions currently in use are detached and
    /// dropped by their holder.
    pub async fn clear_all(&self) {
        // Drain under lock, close outside lock
        let drained: Vec<_> = {
            let mut slots = self.slots.write().await;
            slots.drain().collect()
        };

        for (database, slot) in drained {
            let session = match slot.try_lock() {
                Ok(mut guard) => guard.take(),
                Err(_) => continue,
            };
            if let Some(session) = session {
                info!(database = %database, "Closing connection");
                if let Err(e) = session.close().await {
                    warn!(database = %database, error = %e, "Failed to close connection cleanly");
                }
            }
        }
    }

    /// Number of databases with an open session.
    pub async fn connection_count(&self) -> usize {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter(|slot| slot.try_lock().map(|g| g.is_some()).unwrap_or(true))
            .count()
    }
}

/// Exclusive use of one database's session.
pub struct ConnectionHandle<S: Session> {
    database: String,
    guard: OwnedMutexGuard<Option<S>>,
}

impl<S: Session> ConnectionHandle<S> {
    fn session(&mut self) -> DbResult<&mut S> {
        self.guard
            .as_mut()
            .ok_or_else(|| DbError::connection_lost(format!("No session for {}", self.database)))
    }

    pub async fn ping(&mut self) -> DbResult<()> {
        self.session()?.ping().await
    }

    pub async fn fetch_all(&mut self, statement: &Statement) -> DbResult<Vec<RawRow>> {
        self.session()?.fetch_all(statement).await
    }
}
