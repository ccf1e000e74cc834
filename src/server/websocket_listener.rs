use crate::model::{CodecError, Identity, RelayError};
use crate::server::{ConnectionHandler, Session};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, connection_handler))]
pub fn handle_websocket(
    ws: WebSocketUpgrade,
    identity: Option<Identity>,
    connection_handler: ConnectionHandler,
) -> Response {
    debug!("Upgrading connection");
    ws.on_failed_upgrade(|e| warn!(error = %e, "Websocket upgrade failed"))
        .on_upgrade(move |socket| listen(socket, identity, connection_handler))
}

/// Drives one session from activation to close.
#[instrument(skip(socket, connection_handler), fields(identity = ?identity))]
async fn listen(socket: WebSocket, identity: Option<Identity>, connection_handler: ConnectionHandler) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel(connection_handler.queue_capacity());
    let mut session = connection_handler.session(identity);
    let mut shutdown = connection_handler.shutdown_signal();

    match session.activate(tx).await {
        Ok(()) => {
            let sender_task = handle_outgoing_messages(rx, ws_sender);
            let receiver_task = handle_incoming_messages(
                ws_receiver,
                &session,
                connection_handler.idle_timeout(),
            );

            tokio::select! {
                _ = sender_task => {
                    info!(connection_id = %session.connection_id(), "Sender task completed");
                }
                _ = receiver_task => {
                    info!(connection_id = %session.connection_id(), "Receiver task completed");
                }
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!(connection_id = %session.connection_id(), "Server shutting down");
                }
            }
        }
        Err(e) => error!(error = ?e, "Failed to activate session"),
    }

    if let Err(e) = session.close().await {
        error!(error = ?e, "Failed to close session");
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stopping = *shutdown.borrow_and_update();
        if stopping {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone without signalling, never resolve.
            std::future::pending::<()>().await;
        }
    }
}

#[instrument(skip(rx, ws_sender))]
pub async fn handle_outgoing_messages(
    mut rx: Receiver<Message>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    debug!("Started handling outgoing messages");
    while let Some(msg) = rx.recv().await {
        if let Err(e) = ws_sender.send(msg).await {
            debug!(error = ?e, "Failed to send message");
            return;
        }
    }
    debug!("Outbound queue closed");
    let _ = ws_sender.send(Message::Close(None)).await;
}

#[instrument(skip(receiver, session), fields(connection_id = %session.connection_id()))]
pub async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    session: &Session,
    idle_timeout: Option<Duration>,
) {
    debug!("Started handling incoming messages");
    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!(?limit, "Idle timeout elapsed");
                    break;
                }
            },
            None => receiver.next().await,
        };

        match next {
            Some(Ok(message)) => {
                if handle_message(message, session).await.is_break() {
                    break;
                }
            }
            Some(Err(e)) => {
                debug!(error = ?e, "Failed to receive message");
                break;
            }
            None => {
                debug!("Connection closed");
                break;
            }
        }
    }
}

pub async fn handle_message(message: Message, session: &Session) -> ControlFlow<()> {
    let result: Result<(), RelayError> = match message {
        Message::Text(text) => session.handle_text(&text).await.map(|delivery| {
            debug!(?delivery, "Relayed message");
        }),
        Message::Binary(_) => Err(CodecError::UnsupportedFrame("binary").into()),
        Message::Ping(_) | Message::Pong(_) => Ok(()),
        Message::Close(_) => {
            info!(identity = ?session.identity(), "Client closed connection");
            return ControlFlow::Break(());
        }
    };

    match result {
        Ok(()) => ControlFlow::Continue(()),
        Err(RelayError::InvalidData(e)) => {
            warn!(error = %e, identity = ?session.identity(), "Discarding malformed message");
            ControlFlow::Continue(())
        }
        Err(RelayError::SessionClosed) => ControlFlow::Break(()),
        Err(e) => {
            error!(error = ?e, "Failed to relay message");
            ControlFlow::Continue(())
        }
    }
}
