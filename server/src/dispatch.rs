//! Routing of decoded datagrams to their message handlers
//!
//! The [`Dispatcher`] owns every piece of mutable session state: the
//! connection table and the session id allocator. It handles one datagram at
//! a time and returns the packets that should go out as a result, leaving the
//! socket to the network layer.
//!
//! Handling rules:
//! - **Connect**: consult the authorizer and identity resolver, register a new
//!   session and ack `true`; ack `false` on rejection, service failure, a
//!   full table or exhausted session ids. A peer that is already connected is re-acked `true` without
//!   creating a second session.
//! - **Disconnect**: remove the sender and tell every remaining peer its id.
//! - **Move**: accumulate `direction * move_speed` onto the sender's position
//!   and echo the raw direction to every peer, the mover included.
//!
//! Gameplay messages from unknown addresses and undecodable datagrams are
//! dropped without a reply.

use crate::auth::{Authorizer, IdentityResolver, ServiceError};
use crate::connection_table::ConnectionTable;
use crate::network::ServerConfig;
use crate::session::{Session, SessionIdAllocator};
use log::{debug, info, warn};
use shared::{ClientMessage, ServerMessage, Vector2};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// A packet produced by a handler, with the peers it must reach
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub packet: ServerMessage,
    pub recipients: Vec<SocketAddr>,
}

impl Outgoing {
    /// Packet addressed to a single peer
    pub fn unicast(packet: ServerMessage, addr: SocketAddr) -> Self {
        Self {
            packet,
            recipients: vec![addr],
        }
    }
}

/// Owns the session state and turns datagrams into outgoing packets
pub struct Dispatcher<A, I> {
    connections: ConnectionTable,
    ids: SessionIdAllocator,
    authorizer: A,
    identities: I,
    move_speed: f32,
    service_timeout: Duration,
}

impl<A: Authorizer, I: IdentityResolver> Dispatcher<A, I> {
    /// Creates a dispatcher with an empty table and ids starting at 0
    pub fn new(config: &ServerConfig, authorizer: A, identities: I) -> Self {
        Self {
            connections: ConnectionTable::new(config.max_clients),
            ids: SessionIdAllocator::new(),
            authorizer,
            identities,
            move_speed: config.move_speed,
            service_timeout: config.service_timeout,
        }
    }

    /// Read-only view of the connected peers
    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    /// Decodes one datagram and runs its handler to completion
    pub async fn handle_datagram(&mut self, addr: SocketAddr, data: &[u8]) -> Vec<Outgoing> {
        match ClientMessage::decode(data) {
            Ok(message) => self.handle_message(addr, message).await,
            Err(e) => {
                debug!("Dropping {} byte datagram from {}: {}", data.len(), addr, e);
                Vec::new()
            }
        }
    }

    /// Runs the handler for an already decoded message
    pub async fn handle_message(&mut self, addr: SocketAddr, message: ClientMessage) -> Vec<Outgoing> {
        match message {
            ClientMessage::Connect => self.handle_connect(addr).await,
            ClientMessage::Disconnect => self.handle_disconnect(addr),
            ClientMessage::Move { direction } => self.handle_move(addr, direction),
        }
    }

    async fn handle_connect(&mut self, addr: SocketAddr) -> Vec<Outgoing> {
        if let Some(session) = self.connections.lookup(addr) {
            debug!(
                "{} is already connected as session {}, re-acknowledging",
                addr,
                session.id()
            );
            return vec![Outgoing::unicast(
                ServerMessage::ConnectAck { accepted: true },
                addr,
            )];
        }

        let accepted = self.admit(addr).await;
        vec![Outgoing::unicast(ServerMessage::ConnectAck { accepted }, addr)]
    }

    /// Runs the connect checks and registers the peer if they all pass
    async fn admit(&mut self, addr: SocketAddr) -> bool {
        if self.connections.len() >= self.connections.capacity() {
            warn!("Rejecting {}: server full", addr);
            return false;
        }
        let Some(id) = self.ids.peek() else {
            warn!("Rejecting {}: session ids exhausted", addr);
            return false;
        };

        let limit = self.service_timeout;
        match bounded("authorization service", limit, self.authorizer.authorize(addr)).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Connect from {} rejected by authorization service", addr);
                return false;
            }
            Err(e) => {
                warn!("Rejecting {}: {}", addr, e);
                return false;
            }
        }

        let name = match bounded("identity service", limit, self.identities.resolve_name(addr)).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Rejecting {}: {}", addr, e);
                return false;
            }
        };

        // The id is only consumed once the session is actually registered.
        let session = Session::new(id, name);
        match self.connections.register(addr, session) {
            Ok(()) => {
                self.ids.allocate();
                true
            }
            Err(e) => {
                warn!("Rejecting {}: {}", addr, e);
                false
            }
        }
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) -> Vec<Outgoing> {
        let Some(session) = self.connections.unregister(addr) else {
            debug!("Ignoring disconnect from unknown peer {}", addr);
            return Vec::new();
        };

        let recipients = self.connections.addrs();
        if recipients.is_empty() {
            return Vec::new();
        }

        vec![Outgoing {
            packet: ServerMessage::PeerDisconnected {
                peer_id: session.id(),
            },
            recipients,
        }]
    }

    fn handle_move(&mut self, addr: SocketAddr, direction: Vector2) -> Vec<Outgoing> {
        let move_speed = self.move_speed;
        let Some(session) = self.connections.lookup_mut(addr) else {
            debug!("Ignoring move from unknown peer {}", addr);
            return Vec::new();
        };

        session.apply_move(direction, move_speed);
        let peer_id = session.id();
        debug!("Session {} moved to {:?}", peer_id, session.position());

        vec![Outgoing {
            packet: ServerMessage::PeerMoved {
                peer_id,
                delta: direction,
            },
            recipients: self.connections.addrs(),
        }]
    }
}

/// Awaits an external call for at most `limit`
async fn bounded<T>(
    service: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ServiceError::new(service, format!("no response within {:?}", limit)))?
}
