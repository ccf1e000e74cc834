use thiserror::Error;

/// Failure to turn an inbound frame into a [`Position`](super::Position).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(&'static str),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid data received: {0}")]
    InvalidData(#[from] CodecError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session already closed")]
    SessionClosed,

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
