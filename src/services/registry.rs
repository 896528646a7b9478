use indexmap::IndexMap;
use tracing::{info, warn};

use crate::services::connection::{ConnectionId, RelayClient};

/// Outcome of one broadcast round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients that accepted the payload.
    pub delivered: usize,
    /// Clients that failed and were removed.
    pub dropped: Vec<ConnectionId>,
}

/// Live relay clients, bounded by `max_connections`.
///
/// Owned by the main loop alone, so it needs no locking; broadcasts are
/// serialized by construction and every client sees payloads in the same order.
pub struct ClientRegistry<C> {
    clients: IndexMap<ConnectionId, C>,
    max_connections: usize,
}

impl<C: RelayClient> ClientRegistry<C> {
    /// Create an empty registry.
    pub fn new(max_connections: usize) -> Self {
        Self {
            clients: IndexMap::with_capacity(max_connections),
            max_connections,
        }
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Whether a new client would exceed the bound.
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_connections
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.clients.contains_key(id)
    }

    /// Register a client, handing it back when the registry is full.
    pub fn insert(&mut self, client: C) -> Result<(), C> {
        if self.is_full() {
            return Err(client);
        }
        self.clients.insert(client.id(), client);
        Ok(())
    }

    /// Unregister and close `id`. Returns `false` when it was already gone.
    pub async fn remove(&mut self, id: ConnectionId) -> bool {
        match self.clients.shift_remove(&id) {
            Some(mut client) => {
                client.close().await;
                info!(%id, remaining = self.clients.len(), "relay client removed");
                true
            }
            None => false,
        }
    }

    /// Write `payload` to every client, dropping the ones whose write fails.
    pub async fn broadcast(&mut self, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for (id, client) in self.clients.iter_mut() {
            match client.process(payload).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(%id, error = %err, "relay write failed; dropping client");
                    report.dropped.push(*id);
                }
            }
        }

        for id in &report.dropped {
            self.remove(*id).await;
        }
        report
    }

    /// Close every client, used on shutdown.
    pub async fn close_all(&mut self) {
        for (_, mut client) in self.clients.drain(..) {
            client.close().await;
        }
    }
}
