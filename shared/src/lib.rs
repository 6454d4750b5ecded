//! Wire protocol shared by the session server and its clients.

pub mod codec;
pub mod math;
pub mod packet;

pub use codec::{CodeUnit, Decode, DecodeError, Encode, PacketReader, PacketWriter};
pub use math::Vector2;
pub use packet::{ClientMessage, MessageType, ServerMessage};

/// Displacement applied per unit of requested movement direction.
pub const MOVE_SPEED: f32 = 5.0;

/// Receive buffer size; larger datagrams are truncated by the socket.
pub const MAX_DATAGRAM_SIZE: usize = 2048;
