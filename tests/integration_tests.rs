//! Integration tests for the session server
//!
//! Every test starts a real server on a loopback port and talks to it over
//! UDP, the same way a game client would.

use assert_approx_eq::assert_approx_eq;
use server::auth::{AllowAll, GuestNames};
use server::network::{Server, ServerConfig, ShutdownHandle};
use shared::{ClientMessage, ServerMessage, Vector2, MAX_DATAGRAM_SIZE};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_test::assert_ok;

type TestServer = Server<AllowAll, GuestNames>;

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    task: JoinHandle<io::Result<TestServer>>,
}

impl Running {
    async fn start(config: ServerConfig) -> Self {
        let mut server = Server::bind(config, AllowAll, GuestNames)
            .await
            .expect("Failed to bind server socket");
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();

        let task = tokio::spawn(async move {
            server.run().await?;
            Ok::<_, io::Error>(server)
        });

        Running {
            addr,
            shutdown,
            task,
        }
    }

    async fn start_default() -> Self {
        Self::start(ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        })
        .await
    }

    /// Stops the server and hands back its final state
    async fn stop(self) -> TestServer {
        self.shutdown.shutdown();
        let joined = timeout(Duration::from_secs(1), self.task)
            .await
            .expect("server did not stop");
        assert_ok!(joined.unwrap())
    }
}

struct Peer {
    socket: UdpSocket,
    server: SocketAddr,
}

impl Peer {
    async fn new(server: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind client socket");
        Peer { socket, server }
    }

    async fn connected(server: SocketAddr) -> Self {
        let peer = Self::new(server).await;
        peer.send(&ClientMessage::Connect).await;
        assert_eq!(peer.recv().await, ServerMessage::ConnectAck { accepted: true });
        peer
    }

    fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    async fn send(&self, message: &ClientMessage) {
        self.send_raw(&message.encode()).await;
    }

    async fn send_raw(&self, data: &[u8]) {
        self.socket.send_to(data, self.server).await.unwrap();
    }

    async fn recv(&self) -> ServerMessage {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = timeout(Duration::from_secs(1), self.socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for a packet")
            .unwrap();
        assert_eq!(from, self.server);
        ServerMessage::decode(&buf[..len]).expect("server sent an undecodable packet")
    }

    async fn expect_silence(&self) {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let result = timeout(Duration::from_millis(100), self.socket.recv_from(&mut buf)).await;
        if let Ok(received) = result {
            let (len, _) = received.unwrap();
            panic!("unexpected packet: {:?}", ServerMessage::decode(&buf[..len]));
        }
    }
}

/// CONNECTION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn connect_is_acknowledged_once() {
        let server = Running::start_default().await;

        let peer = Peer::connected(server.addr).await;
        peer.expect_silence().await;

        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 1);
        let session = state.connections().lookup(peer.addr()).unwrap();
        assert_eq!(session.id(), 0);
        assert_eq!(session.position(), Vector2::ZERO);
    }

    #[tokio::test]
    async fn duplicate_connect_keeps_one_session() {
        let server = Running::start_default().await;

        let peer = Peer::connected(server.addr).await;
        peer.send(&ClientMessage::Connect).await;
        assert_eq!(peer.recv().await, ServerMessage::ConnectAck { accepted: true });

        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 1);
        assert_eq!(state.connections().lookup(peer.addr()).unwrap().id(), 0);
    }

    #[tokio::test]
    async fn connect_beyond_capacity_is_rejected() {
        let server = Running::start(ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            max_clients: 1,
            ..ServerConfig::default()
        })
        .await;

        let _first = Peer::connected(server.addr).await;
        let second = Peer::new(server.addr).await;
        second.send(&ClientMessage::Connect).await;
        assert_eq!(second.recv().await, ServerMessage::ConnectAck { accepted: false });

        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 1);
        assert!(state.connections().lookup(second.addr()).is_none());
    }

    #[tokio::test]
    async fn disconnect_notifies_remaining_peers_only() {
        let server = Running::start_default().await;
        let a = Peer::connected(server.addr).await;
        let b = Peer::connected(server.addr).await;
        let c = Peer::connected(server.addr).await;

        b.send(&ClientMessage::Disconnect).await;

        let expected = ServerMessage::PeerDisconnected { peer_id: 1 };
        assert_eq!(a.recv().await, expected);
        assert_eq!(c.recv().await, expected);
        b.expect_silence().await;

        // The departed peer receives no further broadcasts.
        a.send(&ClientMessage::Move {
            direction: Vector2::new(0.0, 1.0),
        })
        .await;
        assert!(matches!(a.recv().await, ServerMessage::PeerMoved { peer_id: 0, .. }));
        assert!(matches!(c.recv().await, ServerMessage::PeerMoved { peer_id: 0, .. }));
        b.expect_silence().await;

        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 2);
        assert!(state.connections().lookup(b.addr()).is_none());
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let server = Running::start_default().await;
        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 0);
    }
}

/// GAMEPLAY TESTS
mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn move_broadcasts_unscaled_delta_to_everyone() {
        let server = Running::start_default().await;
        let mover = Peer::connected(server.addr).await;
        let watcher = Peer::connected(server.addr).await;

        let direction = Vector2::new(1.0, 0.0);
        mover.send(&ClientMessage::Move { direction }).await;

        let expected = ServerMessage::PeerMoved {
            peer_id: 0,
            delta: direction,
        };
        assert_eq!(mover.recv().await, expected);
        assert_eq!(watcher.recv().await, expected);
        mover.expect_silence().await;
        watcher.expect_silence().await;

        let state = server.stop().await;
        let position = state.connections().lookup(mover.addr()).unwrap().position();
        assert_approx_eq!(position.x, 5.0);
        assert_approx_eq!(position.y, 0.0);
    }

    #[tokio::test]
    async fn moves_from_one_peer_apply_in_order() {
        let server = Running::start_default().await;
        let mover = Peer::connected(server.addr).await;

        let directions = [
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 2.0),
            Vector2::new(-0.5, 0.0),
        ];
        for direction in directions {
            mover.send(&ClientMessage::Move { direction }).await;
        }
        for direction in directions {
            assert_eq!(
                mover.recv().await,
                ServerMessage::PeerMoved {
                    peer_id: 0,
                    delta: direction
                }
            );
        }

        let state = server.stop().await;
        let position = state.connections().lookup(mover.addr()).unwrap().position();
        assert_approx_eq!(position.x, 2.5);
        assert_approx_eq!(position.y, 10.0);
    }
}

/// STRESS AND ERROR HANDLING TESTS
mod error_handling_tests {
    use super::*;

    #[tokio::test]
    async fn repeated_disconnect_and_stranger_move_are_ignored() {
        let server = Running::start_default().await;
        let a = Peer::connected(server.addr).await;
        let b = Peer::connected(server.addr).await;

        b.send(&ClientMessage::Disconnect).await;
        assert_eq!(a.recv().await, ServerMessage::PeerDisconnected { peer_id: 1 });

        b.send(&ClientMessage::Disconnect).await;
        a.expect_silence().await;

        let stranger = Peer::new(server.addr).await;
        stranger
            .send(&ClientMessage::Move {
                direction: Vector2::new(1.0, 1.0),
            })
            .await;
        a.expect_silence().await;
        stranger.expect_silence().await;

        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 1);
    }

    #[tokio::test]
    async fn malformed_datagrams_do_not_affect_other_peers() {
        let server = Running::start_default().await;
        let good = Peer::connected(server.addr).await;
        let bad = Peer::connected(server.addr).await;

        let full_move = ClientMessage::Move {
            direction: Vector2::new(1.0, 1.0),
        }
        .encode();
        bad.send_raw(&full_move[..5]).await;
        bad.send_raw(&[0x02]).await;
        bad.send_raw(&[]).await;
        bad.send_raw(&[0xEF, 0xBE, 0xAD, 0xDE]).await;
        bad.expect_silence().await;
        good.expect_silence().await;

        let direction = Vector2::new(0.0, -1.0);
        good.send(&ClientMessage::Move { direction }).await;
        let expected = ServerMessage::PeerMoved {
            peer_id: 0,
            delta: direction,
        };
        assert_eq!(good.recv().await, expected);
        assert_eq!(bad.recv().await, expected);

        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 2);
        assert_eq!(
            state.connections().lookup(bad.addr()).unwrap().position(),
            Vector2::ZERO
        );
    }

    #[tokio::test]
    async fn many_peers_receive_every_broadcast() {
        let server = Running::start_default().await;

        let mut peers = Vec::new();
        for _ in 0..8 {
            peers.push(Peer::connected(server.addr).await);
        }

        peers[3]
            .send(&ClientMessage::Move {
                direction: Vector2::new(0.25, 0.25),
            })
            .await;

        for peer in &peers {
            assert!(matches!(
                peer.recv().await,
                ServerMessage::PeerMoved { peer_id: 3, .. }
            ));
        }

        let state = server.stop().await;
        assert_eq!(state.connected_peers(), 8);
    }
}
