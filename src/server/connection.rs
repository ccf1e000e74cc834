use crate::model::{ConnectionId, Identity};
use axum::extract::ws::Message;
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

/// A registered client: its ids and the sending half of its outbound queue.
#[derive(Debug, Clone)]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub identity: Option<Identity>,
    pub sender: Sender<Message>,
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id == other.connection_id && self.identity == other.identity
    }
}

impl Connection {
    pub fn new(identity: Option<Identity>, sender: Sender<Message>) -> Self {
        Connection {
            connection_id: Uuid::new_v4(),
            identity,
            sender,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }
}
