//! Message catalogue shared by the server and its clients
//!
//! Each message kind owns a [`MessageType`] tag and one encode/decode arm.
//! Inbound traffic is a [`ClientMessage`], outbound traffic a
//! [`ServerMessage`]. Bytes after a complete payload are ignored.

use crate::codec::{DecodeError, PacketReader, PacketWriter};
use crate::math::Vector2;

/// Wire tag at offset 0 of every packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    Connect = 0,
    Disconnect = 1,
    Move = 2,
}

impl From<MessageType> for u16 {
    fn from(message_type: MessageType) -> u16 {
        message_type as u16
    }
}

impl TryFrom<u16> for MessageType {
    type Error = DecodeError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(MessageType::Connect),
            1 => Ok(MessageType::Disconnect),
            2 => Ok(MessageType::Move),
            other => Err(DecodeError::UnknownMessageType(other)),
        }
    }
}

/// Packets sent from a client to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Connect,
    Disconnect,
    /// Requested movement direction, scaled by the server's move speed
    Move { direction: Vector2 },
}

impl ClientMessage {
    /// Tag this message is sent under
    pub fn message_type(&self) -> MessageType {
        match self {
            ClientMessage::Connect => MessageType::Connect,
            ClientMessage::Disconnect => MessageType::Disconnect,
            ClientMessage::Move { .. } => MessageType::Move,
        }
    }

    /// Serializes the message into a datagram
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = PacketWriter::new(self.message_type());
        if let ClientMessage::Move { direction } = self {
            writer.write(direction);
        }
        writer.into_bytes()
    }

    /// Parses a datagram sent by a client
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = PacketReader::new(data)?;
        match MessageType::try_from(reader.message_type())? {
            MessageType::Connect => Ok(ClientMessage::Connect),
            MessageType::Disconnect => Ok(ClientMessage::Disconnect),
            MessageType::Move => Ok(ClientMessage::Move {
                direction: reader.read()?,
            }),
        }
    }
}

/// Packets sent from the server to one or all clients
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Reply to a connect request
    ConnectAck { accepted: bool },
    /// A peer left; clients despawn its avatar
    PeerDisconnected { peer_id: u64 },
    /// A peer moved by the unscaled displacement it sent
    PeerMoved { peer_id: u64, delta: Vector2 },
}

impl ServerMessage {
    /// Tag this message is sent under; shared with the request it answers
    pub fn message_type(&self) -> MessageType {
        match self {
            ServerMessage::ConnectAck { .. } => MessageType::Connect,
            ServerMessage::PeerDisconnected { .. } => MessageType::Disconnect,
            ServerMessage::PeerMoved { .. } => MessageType::Move,
        }
    }

    /// Serializes the message into a datagram
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = PacketWriter::new(self.message_type());
        match self {
            ServerMessage::ConnectAck { accepted } => {
                writer.write(accepted);
            }
            ServerMessage::PeerDisconnected { peer_id } => {
                writer.write(peer_id);
            }
            ServerMessage::PeerMoved { peer_id, delta } => {
                writer.write(peer_id).write(delta);
            }
        }
        writer.into_bytes()
    }

    /// Parses a datagram sent by the server
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = PacketReader::new(data)?;
        match MessageType::try_from(reader.message_type())? {
            MessageType::Connect => Ok(ServerMessage::ConnectAck {
                accepted: reader.read()?,
            }),
            MessageType::Disconnect => Ok(ServerMessage::PeerDisconnected {
                peer_id: reader.read()?,
            }),
            MessageType::Move => Ok(ServerMessage::PeerMoved {
                peer_id: reader.read()?,
                delta: reader.read()?,
            }),
        }
    }
}
