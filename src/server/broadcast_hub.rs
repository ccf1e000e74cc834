//! Single-topic fan-out over the connection registry.
//!
//! Every registered connection is a subscriber. A publish takes a snapshot of
//! the subscribers from the repository and then enqueues the frame on each
//! subscriber's bounded queue with `try_send`, so a publisher never waits on
//! a slow client and the registry lock is never held during delivery.

use super::{Connection, ConnectionRepository};
use crate::config::SlowConsumerPolicy;
use crate::model::{ConnectionId, Event, Result};
use axum::extract::ws::Message;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, instrument, warn};

/// Outcome of a single publish.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
    pub evicted: usize,
    pub closed: usize,
}

#[derive(Clone)]
pub struct BroadcastHub {
    connection_repo: Arc<dyn ConnectionRepository>,
    slow_consumer: SlowConsumerPolicy,
}

impl BroadcastHub {
    pub fn new(
        connection_repo: Arc<dyn ConnectionRepository>,
        slow_consumer: SlowConsumerPolicy,
    ) -> Self {
        BroadcastHub {
            connection_repo,
            slow_consumer,
        }
    }

    pub fn connection_repo(&self) -> &Arc<dyn ConnectionRepository> {
        &self.connection_repo
    }

    /// Encodes `event` once and delivers it to every subscriber but `exclude`.
    #[instrument(skip(self, event), fields(event = event.kind(), uuid = %event.identity()))]
    pub async fn broadcast(
        &self,
        event: &Event,
        exclude: Option<ConnectionId>,
    ) -> Result<Delivery> {
        let text = event.encode()?;
        self.broadcast_text(text, exclude).await
    }

    /// Delivers an already encoded frame.
    pub async fn broadcast_text(
        &self,
        text: String,
        exclude: Option<ConnectionId>,
    ) -> Result<Delivery> {
        let subscribers = self.connection_repo.subscribers(exclude).await?;
        let mut delivery = Delivery::default();

        for connection in subscribers {
            match connection.sender.try_send(Message::Text(text.clone())) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => self.on_full(&connection, &mut delivery).await,
                Err(TrySendError::Closed(_)) => {
                    // The subscriber's own session unregisters it.
                    debug!(
                        connection_id = %connection.connection_id,
                        "Subscriber queue closed, skipping"
                    );
                    delivery.closed += 1;
                }
            }
        }

        debug!(?delivery, "Broadcast completed");
        Ok(delivery)
    }

    async fn on_full(&self, connection: &Connection, delivery: &mut Delivery) {
        match self.slow_consumer {
            SlowConsumerPolicy::Drop => {
                warn!(
                    connection_id = %connection.connection_id,
                    identity = ?connection.identity,
                    "Subscriber queue full, dropping event"
                );
                delivery.dropped += 1;
            }
            SlowConsumerPolicy::Disconnect => {
                warn!(
                    connection_id = %connection.connection_id,
                    identity = ?connection.identity,
                    "Subscriber queue full, evicting"
                );
                match self
                    .connection_repo
                    .unregister(connection.connection_id)
                    .await
                {
                    Ok(_) => delivery.evicted += 1,
                    Err(e) => error!(error = ?e, "Failed to evict slow subscriber"),
                }
            }
        }
    }
}
