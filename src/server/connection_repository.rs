use super::Connection;
use crate::model::{ConnectionId, Result};
use async_trait::async_trait;

/// What [`ConnectionRepository::unregister`] found for a connection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The connection was registered and is now gone.
    Removed,
    /// A newer connection with the same identity displaced it.
    Replaced,
    /// Nothing is registered under this id.
    Absent,
}

/// Authoritative set of live connections.
///
/// Implementations must apply every operation atomically: a connection is
/// either fully registered (table and identity index) or not at all.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Adds a connection. An existing entry for the same identity is replaced
    /// and returned.
    async fn register(&self, connection: Connection) -> Result<Option<Connection>>;

    /// Removes a connection. Removing an unknown id is not an error. A
    /// displaced connection reports [`Removal::Replaced`] exactly once.
    async fn unregister(&self, id: ConnectionId) -> Result<Removal>;

    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>>;

    async fn get_all_connections(&self) -> Result<Vec<Connection>>;

    /// Snapshot of the connections a broadcast should reach.
    async fn subscribers(&self, exclude: Option<ConnectionId>) -> Result<Vec<Connection>>;

    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
