mod broadcast_hub;
mod connection;
mod connection_handler;
mod connection_repository;
mod memory_storage;
pub mod route;
mod session;
mod shell;
pub mod telemetry;
pub mod websocket_listener;
mod websocket_server;

pub use broadcast_hub::{BroadcastHub, Delivery};
pub use connection::Connection;
pub use connection_handler::ConnectionHandler;
pub use connection_repository::{ConnectionRepository, Removal};
pub use memory_storage::MemoryStorage;
pub use route::{create_router, AppState, CONNECT_PATH};
pub use session::{Session, SessionState};
pub use shell::{RenderShell, StaticShell};
pub use websocket_server::{shutdown_signal, WebSocketServer};
