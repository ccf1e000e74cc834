mod error;
mod event;
mod identity;

pub use error::{CodecError, RelayError, Result};
pub use event::{Event, Position};
pub use identity::{ConnectParams, ConnectionId, Identity};
