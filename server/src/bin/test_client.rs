use clap::Parser;
use log::{info, warn};
use rand::Rng;
use shared::{ClientMessage, ServerMessage, Vector2, MAX_DATAGRAM_SIZE};
use std::f32::consts::TAU;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[command(author, version, about = "Smoke-test client for the session server", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Number of random moves to send before disconnecting
    #[arg(short = 'n', long, default_value = "10")]
    moves: u32,

    /// Delay between moves in milliseconds
    #[arg(short = 'i', long, default_value = "500")]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let server_addr: SocketAddr = args.server.parse()?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Client socket bound to {}", socket.local_addr()?);

    info!("Sending connect request to {}", server_addr);
    socket
        .send_to(&ClientMessage::Connect.encode(), server_addr)
        .await?;

    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf)).await??;
    match ServerMessage::decode(&buf[..len]) {
        Ok(ServerMessage::ConnectAck { accepted: true }) => info!("Connection accepted"),
        Ok(ServerMessage::ConnectAck { accepted: false }) => {
            warn!("Connection rejected by server");
            return Ok(());
        }
        Ok(other) => {
            warn!("Expected a connect ack but got {:?}", other);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let mut rng = rand::thread_rng();
    for _ in 0..args.moves {
        let angle = rng.gen_range(0.0..TAU);
        let direction = Vector2::new(angle.cos(), angle.sin());
        socket
            .send_to(&ClientMessage::Move { direction }.encode(), server_addr)
            .await?;
        info!("Sent move {:?}", direction);

        drain_broadcasts(&socket, &mut buf, Duration::from_millis(args.interval_ms)).await;
    }

    info!("Sending disconnect request");
    socket
        .send_to(&ClientMessage::Disconnect.encode(), server_addr)
        .await?;

    info!("Test client finished");
    Ok(())
}

/// Prints every broadcast that arrives within `window`
async fn drain_broadcasts(socket: &UdpSocket, buf: &mut [u8], window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match timeout(remaining, socket.recv_from(buf)).await {
            Ok(Ok((len, _))) => match ServerMessage::decode(&buf[..len]) {
                Ok(ServerMessage::PeerMoved { peer_id, delta }) => {
                    info!("Peer {} moved by ({:.2}, {:.2})", peer_id, delta.x, delta.y)
                }
                Ok(ServerMessage::PeerDisconnected { peer_id }) => {
                    info!("Peer {} disconnected", peer_id)
                }
                Ok(other) => info!("Received {:?}", other),
                Err(e) => warn!("Failed to decode packet: {}", e),
            },
            Ok(Err(e)) => {
                warn!("Error receiving packet: {}", e);
                break;
            }
            Err(_) => break,
        }
    }
}
