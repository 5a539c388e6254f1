//! Registry of attached message clients.

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// Unique message-client identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

impl ClientId {
    /// Fresh time-ordered identifier.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self(format!("client_{}", Uuid::now_v7()))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bookkeeping for one attached client.
#[derive(Clone, Debug)]
pub struct ClientInfo {
    /// Remote address of the WebSocket peer.
    pub peer: SocketAddr,
    /// When the client attached.
    pub connected_at: DateTime<Utc>,
}

/// Concurrent map of attached clients. Used only for accounting and the
/// `/health` connection count.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashMap<ClientId, ClientInfo>,
}

impl ClientRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly attached client and return its id.
    pub fn register(&self, peer: SocketAddr) -> ClientId {
        let id = ClientId::new();
        let _ = self.clients.insert(
            id.clone(),
            ClientInfo {
                peer,
                connected_at: Utc::now(),
            },
        );
        id
    }

    /// Forget a client. Returns its bookkeeping if it was registered.
    pub fn unregister(&self, id: &ClientId) -> Option<ClientInfo> {
        self.clients.remove(id).map(|(_, info)| info)
    }

    /// Look up a client.
    pub fn get(&self, id: &ClientId) -> Option<ClientInfo> {
        self.clients.get(id).map(|entry| entry.value().clone())
    }

    /// Number of attached clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is attached.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
