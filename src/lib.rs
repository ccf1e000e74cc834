pub mod model;

#[cfg(feature = "server")]
pub mod config;

#[cfg(feature = "server")]
pub mod server;

pub use model::{RelayError, Result};

pub mod prelude {
    #[cfg(feature = "server")]
    pub use crate::config::{Config, SlowConsumerPolicy};
    pub use crate::model::CodecError;
    pub use crate::model::ConnectParams;
    pub use crate::model::ConnectionId;
    pub use crate::model::Event;
    pub use crate::model::Identity;
    pub use crate::model::Position;
    pub use crate::model::RelayError;
    #[cfg(feature = "server")]
    pub use crate::server::{
        BroadcastHub, Connection, ConnectionHandler, ConnectionRepository, MemoryStorage,
        Removal, RenderShell, Session, SessionState, StaticShell, WebSocketServer,
    };
}
