//! Server network layer handling UDP communications
//!
//! A single task owns the socket. It waits for the next datagram, hands it to
//! the [`Dispatcher`], sends whatever the handler produced, and only then
//! waits again. Datagrams are therefore handled strictly one at a time in
//! arrival order, and the connection table is never touched concurrently.

use crate::auth::{Authorizer, IdentityResolver};
use crate::connection_table::ConnectionTable;
use crate::dispatch::{Dispatcher, Outgoing};
use log::{error, info};
use shared::{MAX_DATAGRAM_SIZE, MOVE_SPEED};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;

/// Runtime settings for the session server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the UDP socket binds to
    pub bind_addr: String,
    /// Displacement applied per unit of requested movement
    pub move_speed: f32,
    /// Maximum number of concurrently connected peers
    pub max_clients: usize,
    /// Upper bound on each authorization or identity lookup
    pub service_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            move_speed: MOVE_SPEED,
            max_clients: 64,
            service_timeout: Duration::from_secs(2),
        }
    }
}

/// Clears the server's "active" flag
///
/// Handling of a datagram already in progress completes before the loop
/// exits.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    active: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Asks the server loop to stop
    pub fn shutdown(&self) {
        self.active.send_replace(false);
    }

    /// Returns false once shutdown has been requested
    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }
}

/// UDP session server
pub struct Server<A, I> {
    socket: UdpSocket,
    dispatcher: Dispatcher<A, I>,
    active: watch::Receiver<bool>,
    shutdown: ShutdownHandle,
}

impl<A: Authorizer, I: IdentityResolver> Server<A, I> {
    /// Binds the UDP socket described by `config`
    pub async fn bind(config: ServerConfig, authorizer: A, identities: I) -> io::Result<Self> {
        let socket = UdpSocket::bind(&config.bind_addr).await?;
        info!("Server listening on {}", socket.local_addr()?);

        let (active_tx, active_rx) = watch::channel(true);

        Ok(Server {
            socket,
            dispatcher: Dispatcher::new(&config, authorizer, identities),
            active: active_rx,
            shutdown: ShutdownHandle {
                active: Arc::new(active_tx),
            },
        })
    }

    /// Returns the address the socket is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Returns a handle that stops [`run`](Self::run) from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Read-only view of the connected peers
    pub fn connections(&self) -> &ConnectionTable {
        self.dispatcher.connections()
    }

    /// Number of currently connected peers
    pub fn connected_peers(&self) -> usize {
        self.dispatcher.connections().len()
    }

    /// Receives and handles datagrams until shut down
    pub async fn run(&mut self) -> io::Result<()> {
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

        info!("Server started successfully");

        while *self.active.borrow() {
            tokio::select! {
                biased;

                // The server holds a sender itself, so this only errors
                // once the server is being dropped.
                _ = self.active.changed() => {}

                received = self.socket.recv_from(&mut buffer) => match received {
                    Ok((len, addr)) => {
                        let outgoing = self.dispatcher.handle_datagram(addr, &buffer[..len]).await;
                        Self::send_all(&self.socket, outgoing).await;
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
            }
        }

        info!("Server shutting down");
        Ok(())
    }

    async fn send_all(socket: &UdpSocket, outgoing: Vec<Outgoing>) {
        for Outgoing { packet, recipients } in outgoing {
            let data = packet.encode();
            for addr in recipients {
                if let Err(e) = socket.send_to(&data, addr).await {
                    error!("Failed to send {:?} to {}: {}", packet.message_type(), addr, e);
                }
            }
        }
    }
}
