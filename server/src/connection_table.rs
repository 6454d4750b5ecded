//! Address-keyed table of connected peers
//!
//! The connection table is the only owner of live [`Session`]s. Each transport
//! address appears at most once, and a session is reachable only through the
//! address it connected from.
//!
//! Iteration order is whatever the underlying hash map yields and may change
//! between calls; broadcasts must not depend on it.

use crate::session::Session;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;

/// Why a session could not be registered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("{0} is already connected")]
    AlreadyRegistered(SocketAddr),
    #[error("server is full ({capacity} clients)")]
    Full { capacity: usize },
}

/// Manages all connected peers and their sessions
pub struct ConnectionTable {
    /// Live sessions indexed by the peer's network address
    sessions: HashMap<SocketAddr, Session>,
    /// Maximum number of concurrent peers allowed
    max_clients: usize,
}

impl ConnectionTable {
    /// Creates an empty table with the given capacity limit
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_clients,
        }
    }

    /// Inserts a session for a newly connected peer
    ///
    /// An address that is already present is never overwritten: the call
    /// fails and the existing session is left untouched. The table is also
    /// left unchanged when it is at capacity.
    pub fn register(&mut self, addr: SocketAddr, session: Session) -> Result<(), RegisterError> {
        if self.sessions.contains_key(&addr) {
            return Err(RegisterError::AlreadyRegistered(addr));
        }
        if self.sessions.len() >= self.max_clients {
            return Err(RegisterError::Full {
                capacity: self.max_clients,
            });
        }

        info!("Session {} ({}) connected from {}", session.id(), session.name(), addr);
        self.sessions.insert(addr, session);
        Ok(())
    }

    /// Removes the peer at `addr`
    ///
    /// Returns the removed session, or `None` if the address was not
    /// connected.
    pub fn unregister(&mut self, addr: SocketAddr) -> Option<Session> {
        let session = self.sessions.remove(&addr)?;
        info!("Session {} disconnected from {}", session.id(), addr);
        Some(session)
    }

    /// Finds the session connected from `addr`
    pub fn lookup(&self, addr: SocketAddr) -> Option<&Session> {
        self.sessions.get(&addr)
    }

    /// Finds the session connected from `addr` for in-place updates
    pub fn lookup_mut(&mut self, addr: SocketAddr) -> Option<&mut Session> {
        self.sessions.get_mut(&addr)
    }

    /// Returns true if `addr` has a live session
    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.sessions.contains_key(&addr)
    }

    /// Iterates over every connected peer in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&SocketAddr, &Session)> + '_ {
        self.sessions.iter()
    }

    /// Collects the addresses of all connected peers for a broadcast
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.sessions.keys().copied().collect()
    }

    /// Returns the number of currently connected peers
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no peers are currently connected
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the maximum number of concurrent peers
    pub fn capacity(&self) -> usize {
        self.max_clients
    }
}
