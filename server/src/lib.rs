//! # Session Server Library
//!
//! Authoritative UDP server for a real-time multiplayer game. Peers connect,
//! move and disconnect by sending small tagged binary packets; the server keeps
//! one session per peer address and re-broadcasts every state change to all
//! connected peers.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Dispatch
//! One task owns the socket and handles each datagram to completion before
//! receiving the next. Handlers never interleave, so the connection table
//! needs no locking and messages from one address are processed in arrival
//! order.
//!
//! ### Failure Isolation
//! A malformed datagram, a gameplay message from an unknown address or a
//! failing external service only affects the datagram that caused it. Nothing
//! a peer sends can stop the loop.
//!
//! ## Module Organization
//!
//! - [`session`]: per-peer state and the session id allocator
//! - [`connection_table`]: address-keyed ownership of live sessions
//! - [`auth`]: authorization and identity collaborators called on connect
//! - [`dispatch`]: Connect / Disconnect / Move handlers
//! - [`network`]: socket ownership, the receive loop and shutdown
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::auth::{AllowAll, GuestNames};
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "0.0.0.0:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::bind(config, AllowAll, GuestNames).await?;
//!     let shutdown = server.shutdown_handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         shutdown.shutdown();
//!     });
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod connection_table;
pub mod dispatch;
pub mod network;
pub mod session;
