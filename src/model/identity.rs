use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Server-side handle for one accepted socket.
///
/// Unlike [`Identity`] this is generated by the relay and never leaves the
/// process, so two sockets claiming the same identity remain distinguishable.
pub type ConnectionId = Uuid;

/// Opaque per-session token chosen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Resolves the identity carried on the connect handshake.
    ///
    /// A missing or empty token yields `None`, which puts the connection into
    /// degraded mode.
    pub fn resolve(token: Option<&str>) -> Option<Self> {
        match token {
            Some(token) if !token.is_empty() => Some(Identity(token.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity(value.to_string())
    }
}

/// Query parameters accepted on the connect endpoint.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConnectParams {
    pub uuid: Option<String>,
}

impl ConnectParams {
    pub fn identity(&self) -> Option<Identity> {
        Identity::resolve(self.uuid.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_token() {
        assert_eq!(Identity::resolve(Some("alice")), Some(Identity::from("alice")));
    }

    #[test]
    fn test_resolve_missing_or_empty() {
        assert_eq!(Identity::resolve(None), None);
        assert_eq!(Identity::resolve(Some("")), None);
    }

    #[test]
    fn test_connect_params() {
        let params: ConnectParams = serde_json::from_str(r#"{"uuid":"bob"}"#).unwrap();
        assert_eq!(params.identity(), Some(Identity::from("bob")));

        let params = ConnectParams::default();
        assert_eq!(params.identity(), None);
    }

    #[test]
    fn test_serialize_transparent() {
        let identity = Identity::from("a1a2a3a4");
        assert_eq!(serde_json::to_string(&identity).unwrap(), r#""a1a2a3a4""#);
    }
}
