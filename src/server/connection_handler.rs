use super::{BroadcastHub, ConnectionRepository, Session};
use crate::config::Config;
use crate::model::Identity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Shared state handed to every connection task.
#[derive(Clone)]
pub struct ConnectionHandler {
    hub: BroadcastHub,
    include_sender: bool,
    queue_capacity: usize,
    idle_timeout: Option<Duration>,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionHandler {
    pub fn new(hub: BroadcastHub, config: &Config, shutdown: watch::Receiver<bool>) -> Self {
        ConnectionHandler {
            hub,
            include_sender: config.include_sender,
            queue_capacity: config.queue_capacity,
            idle_timeout: config.idle_timeout(),
            shutdown,
        }
    }

    /// Starts a session in the `Connecting` state.
    pub fn session(&self, identity: Option<Identity>) -> Session {
        Session::new(identity, self.hub.clone(), self.include_sender)
    }

    pub fn connection_repo(&self) -> &Arc<dyn ConnectionRepository> {
        self.hub.connection_repo()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}
