/// Connection registry
///
/// Tracks every live connection and the per-user rooms they joined. A user
/// may have any number of connections (tabs, devices); a connection may sit
/// in several rooms or in none. Connections outside every room still
/// receive broadcasts.
///
/// Membership changes only on connection lifecycle events (`connect`,
/// `join`, `leave`). Sends take a snapshot of the recipients under the lock
/// and deliver after releasing it, so concurrent joins and leaves never see
/// a half-iterated set.
///
/// Delivery is fire-and-forget: a user with no connections is a silent
/// no-op, and nothing is queued for later.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::connection::{Connection, ConnectionId};
use crate::events::ServerEvent;

/// Room membership and delivery to live connections
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Registers a connection; it receives broadcasts from now on
    async fn connect(&self, connection: Arc<Connection>);

    /// Adds a connection to the room of `user_id`
    ///
    /// Returns `false` if the connection is not registered.
    async fn join(&self, user_id: Uuid, connection: ConnectionId) -> bool;

    /// Removes a connection from the registry and from every room it joined
    async fn leave(&self, connection: ConnectionId);

    /// Delivers to every connection in the room of `user_id`
    ///
    /// Returns how many connections accepted the frame.
    async fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) -> usize;

    /// Delivers to every registered connection
    async fn broadcast(&self, event: &ServerEvent) -> usize;

    async fn connection_count(&self) -> usize;

    /// Number of connections in the room of `user_id`
    async fn room_size(&self, user_id: Uuid) -> usize;
}

struct Member {
    connection: Arc<Connection>,
    rooms: HashSet<Uuid>,
}

#[derive(Default)]
struct Membership {
    connections: HashMap<ConnectionId, Member>,
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
}

/// Single-process registry
#[derive(Default)]
pub struct InMemoryRegistry {
    state: RwLock<Membership>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn encode(event: &ServerEvent) -> Option<Arc<String>> {
    match event.encode() {
        Ok(frame) => Some(Arc::new(frame)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "failed to serialize event");
            None
        }
    }
}

fn deliver(recipients: &[Arc<Connection>], frame: Arc<String>, event: &ServerEvent) -> usize {
    let mut delivered = 0;
    for connection in recipients {
        if connection.send(frame.clone()) {
            delivered += 1;
        } else if connection.is_closed() {
            debug!(
                connection_id = %connection.id,
                event = event.name(),
                "transport closed before leave, frame dropped"
            );
        } else {
            warn!(
                connection_id = %connection.id,
                event = event.name(),
                dropped = connection.drop_count(),
                "outbound buffer full, frame dropped"
            );
        }
    }
    delivered
}

#[async_trait]
impl ConnectionRegistry for InMemoryRegistry {
    async fn connect(&self, connection: Arc<Connection>) {
        let id = connection.id;
        let mut state = self.state.write().await;
        state.connections.insert(
            id,
            Member {
                connection,
                rooms: HashSet::new(),
            },
        );
        debug!(connection_id = %id, total = state.connections.len(), "connection registered");
    }

    async fn join(&self, user_id: Uuid, connection: ConnectionId) -> bool {
        let mut state = self.state.write().await;

        let Some(member) = state.connections.get_mut(&connection) else {
            warn!(connection_id = %connection, %user_id, "join from unregistered connection");
            return false;
        };
        member.rooms.insert(user_id);

        let room = state.rooms.entry(user_id).or_default();
        room.insert(connection);
        debug!(connection_id = %connection, %user_id, room_size = room.len(), "joined room");
        true
    }

    async fn leave(&self, connection: ConnectionId) {
        let mut state = self.state.write().await;

        let Some(member) = state.connections.remove(&connection) else {
            return;
        };

        for user_id in &member.rooms {
            if let Some(room) = state.rooms.get_mut(user_id) {
                room.remove(&connection);
                if room.is_empty() {
                    state.rooms.remove(user_id);
                }
            }
        }
        debug!(
            connection_id = %connection,
            rooms = member.rooms.len(),
            total = state.connections.len(),
            "connection removed"
        );
    }

    async fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) -> usize {
        let recipients: Vec<Arc<Connection>> = {
            let state = self.state.read().await;
            state
                .rooms
                .get(&user_id)
                .map(|room| {
                    room.iter()
                        .filter_map(|id| state.connections.get(id))
                        .map(|member| member.connection.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        if recipients.is_empty() {
            debug!(%user_id, event = event.name(), "user has no live connections, dropping");
            return 0;
        }

        let Some(frame) = encode(event) else { return 0 };
        let delivered = deliver(&recipients, frame, event);
        debug!(%user_id, event = event.name(), delivered, "sent event to user");
        delivered
    }

    async fn broadcast(&self, event: &ServerEvent) -> usize {
        let recipients: Vec<Arc<Connection>> = {
            let state = self.state.read().await;
            state
                .connections
                .values()
                .map(|member| member.connection.clone())
                .collect()
        };

        if recipients.is_empty() {
            return 0;
        }

        let Some(frame) = encode(event) else { return 0 };
        let delivered = deliver(&recipients, frame, event);
        debug!(event = event.name(), recipients = recipients.len(), delivered, "broadcast event");
        delivered
    }

    async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    async fn room_size(&self, user_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .rooms
            .get(&user_id)
            .map_or(0, HashSet::len)
    }
}
