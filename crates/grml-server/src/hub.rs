//! The broadcast hub shared by all socket tasks.
//!
//! Every connected client owns an unbounded channel; its socket task drains
//! the channel into the socket. A frame received from one client is pushed
//! into every other client's channel unchanged.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelayHub {
    clients: Arc<DashMap<ClientId, mpsc::UnboundedSender<String>>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client. Frames for it arrive on the returned receiver.
    pub fn join(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let id = ClientId(Uuid::new_v4());
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(id, tx);
        tracing::info!(client = %id, clients = self.clients.len(), "client joined");
        (id, rx)
    }

    pub fn leave(&self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            tracing::info!(client = %id, clients = self.clients.len(), "client left");
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Sends `frame` to every client except `from`. Clients whose channel
    /// is closed are dropped. Returns the number of clients reached.
    pub fn broadcast(&self, from: ClientId, frame: &str) -> usize {
        let mut closed = Vec::new();
        let mut reached = 0;
        for entry in self.clients.iter() {
            if *entry.key() == from {
                continue;
            }
            if entry.value().send(frame.to_string()).is_ok() {
                reached += 1;
            } else {
                closed.push(*entry.key());
            }
        }
        // removal has to wait until the iteration's shard locks are released
        for id in closed {
            self.leave(id);
        }
        reached
    }

    pub fn send_to(&self, id: ClientId, frame: &str) -> Result<(), RelayError> {
        let delivered = self
            .clients
            .get(&id)
            .map(|tx| tx.send(frame.to_string()).is_ok())
            .unwrap_or(false);
        if delivered {
            Ok(())
        } else {
            self.leave(id);
            Err(RelayError::UnknownClient { client: id })
        }
    }
}
