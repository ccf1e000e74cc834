use super::{CodecError, Identity};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Pointer coordinates as sent by a client.
///
/// The numbers keep the representation the client used, so an integer
/// coordinate is relayed as an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: Number,
    pub y: Number,
}

impl Position {
    pub fn new(x: impl Into<Number>, y: impl Into<Number>) -> Self {
        Position {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Decodes an inbound client frame.
    ///
    /// The payload must be a JSON object with numeric `x` and `y`. Any other
    /// field, including a client supplied `uuid`, is ignored.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(CodecError::NotAnObject);
        }
        Ok(Position::deserialize(value)?)
    }
}

/// Events pushed from the relay to its clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Join {
        uuid: Identity,
    },
    Update {
        uuid: Identity,
        x: Number,
        y: Number,
    },
    Leave {
        uuid: Identity,
    },
}

impl Event {
    pub fn join(identity: Identity) -> Self {
        Event::Join { uuid: identity }
    }

    /// Tags a position with the identity of the connection it arrived on.
    pub fn update(identity: Identity, position: Position) -> Self {
        Event::Update {
            uuid: identity,
            x: position.x,
            y: position.y,
        }
    }

    pub fn leave(identity: Identity) -> Self {
        Event::Leave { uuid: identity }
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Event::Join { uuid } | Event::Update { uuid, .. } | Event::Leave { uuid } => uuid,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Join { .. } => "join",
            Event::Update { .. } => "update",
            Event::Leave { .. } => "leave",
        }
    }

    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }
}
