use super::{BroadcastHub, Connection, Delivery, Removal};
use crate::model::{ConnectionId, Event, Identity, Position, RelayError, Result};
use axum::extract::ws::Message;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// Lifecycle of one client connection.
///
/// The owning task drives the transitions: [`Session::activate`] once the
/// upgrade completed, [`Session::handle_text`] for every inbound frame and
/// [`Session::close`] when the transport ends. `join` and `leave` are only
/// synthesized for sessions that carry an identity.
pub struct Session {
    connection_id: ConnectionId,
    identity: Option<Identity>,
    state: SessionState,
    hub: BroadcastHub,
    include_sender: bool,
}

impl Session {
    pub fn new(identity: Option<Identity>, hub: BroadcastHub, include_sender: bool) -> Self {
        Session {
            connection_id: Uuid::new_v4(),
            identity,
            state: SessionState::Connecting,
            hub,
            include_sender,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn exclude(&self) -> Option<ConnectionId> {
        (!self.include_sender).then_some(self.connection_id)
    }

    /// `Connecting → Active`: registers the connection and announces it.
    ///
    /// When the identity was already connected, the displaced connection's
    /// `leave` goes out first, so peers always see `leave` before `join`.
    #[instrument(skip(self, sender), fields(connection_id = %self.connection_id, identity = ?self.identity))]
    pub async fn activate(&mut self, sender: Sender<Message>) -> Result<()> {
        if self.state != SessionState::Connecting {
            return Err(RelayError::InternalError(format!(
                "cannot activate session in state {:?}",
                self.state
            )));
        }

        let connection = Connection {
            connection_id: self.connection_id,
            identity: self.identity.clone(),
            sender,
        };
        let displaced = self.hub.connection_repo().register(connection).await?;
        self.state = SessionState::Active;

        if let Some(displaced) = displaced {
            info!(
                displaced = %displaced.connection_id,
                "Identity reconnected, previous connection replaced"
            );
            if let Some(identity) = displaced.identity {
                self.hub
                    .broadcast(&Event::leave(identity), self.exclude())
                    .await?;
            }
        }

        if let Some(identity) = &self.identity {
            self.hub
                .broadcast(&Event::join(identity.clone()), self.exclude())
                .await?;
        }
        info!("Client connected");
        Ok(())
    }

    /// Relays one inbound text frame.
    ///
    /// Identified sessions publish an `update` tagged with their own identity.
    /// Anonymous sessions forward the frame verbatim once it decodes. A frame
    /// that does not decode is reported as [`RelayError::InvalidData`] and
    /// nothing is published.
    pub async fn handle_text(&self, text: &str) -> Result<Delivery> {
        if self.state != SessionState::Active {
            return Err(RelayError::SessionClosed);
        }

        let position = Position::decode(text)?;
        match &self.identity {
            Some(identity) => {
                let event = Event::update(identity.clone(), position);
                self.hub.broadcast(&event, self.exclude()).await
            }
            None => {
                self.hub
                    .broadcast_text(text.to_string(), self.exclude())
                    .await
            }
        }
    }

    /// `→ Closed`: unregisters and announces the departure.
    ///
    /// Returns `false` when the session was already closed. Only a session
    /// that reached `Active` publishes `leave`, and a replaced session leaves
    /// that to its successor.
    #[instrument(skip(self), fields(connection_id = %self.connection_id, identity = ?self.identity))]
    pub async fn close(&mut self) -> Result<bool> {
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);
        match previous {
            SessionState::Closed => return Ok(false),
            SessionState::Connecting => {
                debug!("Session closed before activation");
                return Ok(true);
            }
            SessionState::Active => {}
        }

        let removal = match self
            .hub
            .connection_repo()
            .unregister(self.connection_id)
            .await
        {
            Ok(removal) => removal,
            Err(e) => {
                warn!(error = ?e, "Failed to unregister connection");
                Removal::Absent
            }
        };

        match (&self.identity, removal) {
            (Some(_), Removal::Replaced) => {
                debug!("Connection was replaced, leave already published");
            }
            (Some(identity), _) => {
                if let Err(e) = self.hub.broadcast(&Event::leave(identity.clone()), None).await {
                    warn!(error = ?e, "Failed to publish leave");
                    return Err(e);
                }
            }
            (None, _) => {}
        }
        info!("Client disconnected");
        Ok(true)
    }
}
