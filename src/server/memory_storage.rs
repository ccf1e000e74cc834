use super::{Connection, ConnectionRepository, Removal};
use crate::model::{ConnectionId, Identity, RelayError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, instrument};

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    identities: HashMap<Identity, ConnectionId>,
    // Displaced connections whose sessions have not closed yet.
    replaced: HashSet<ConnectionId>,
}

/// In-process [`ConnectionRepository`].
///
/// The connection table and the identity index share one lock so that no
/// caller ever observes one without the other.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    registry: Arc<RwLock<Registry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> RelayError {
    error!(error = %e, "Connection registry lock poisoned");
    RelayError::InternalError(e.to_string())
}

#[async_trait]
impl ConnectionRepository for MemoryStorage {
    #[instrument(skip(self, connection), fields(connection_id = %connection.connection_id))]
    async fn register(&self, connection: Connection) -> Result<Option<Connection>> {
        debug!(identity = ?connection.identity, "Registering connection");
        let mut registry = self.registry.write().map_err(poisoned)?;

        let displaced = match &connection.identity {
            Some(identity) => registry
                .identities
                .insert(identity.clone(), connection.connection_id)
                .filter(|previous| *previous != connection.connection_id)
                .and_then(|previous| registry.connections.remove(&previous)),
            None => None,
        };
        if let Some(displaced) = &displaced {
            registry.replaced.insert(displaced.connection_id);
            debug!(
                displaced = %displaced.connection_id,
                "Identity already registered, replacing connection"
            );
        }

        registry
            .connections
            .insert(connection.connection_id, connection);
        debug!(
            connection_count = registry.connections.len(),
            "Connection registered"
        );
        Ok(displaced)
    }

    #[instrument(skip(self))]
    async fn unregister(&self, id: ConnectionId) -> Result<Removal> {
        let mut registry = self.registry.write().map_err(poisoned)?;

        let Some(connection) = registry.connections.remove(&id) else {
            if registry.replaced.remove(&id) {
                debug!("Connection was replaced by a newer one");
                return Ok(Removal::Replaced);
            }
            debug!("Connection already unregistered");
            return Ok(Removal::Absent);
        };
        if let Some(identity) = &connection.identity {
            if registry.identities.get(identity) == Some(&id) {
                registry.identities.remove(identity);
            }
        }
        debug!(
            connection_count = registry.connections.len(),
            "Connection unregistered"
        );
        Ok(Removal::Removed)
    }

    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>> {
        let registry = self.registry.read().map_err(poisoned)?;
        Ok(registry.connections.get(&id).cloned())
    }

    async fn get_all_connections(&self) -> Result<Vec<Connection>> {
        let registry = self.registry.read().map_err(poisoned)?;
        Ok(registry.connections.values().cloned().collect())
    }

    async fn subscribers(&self, exclude: Option<ConnectionId>) -> Result<Vec<Connection>> {
        let registry = self.registry.read().map_err(poisoned)?;
        Ok(registry
            .connections
            .values()
            .filter(|connection| Some(connection.connection_id) != exclude)
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        let registry = self.registry.read().map_err(poisoned)?;
        Ok(registry.connections.len())
    }
}
