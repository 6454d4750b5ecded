//! Little-endian binary codec for tagged packets
//!
//! Every packet starts with a `u16` message-type tag followed by a payload made
//! of fixed-width primitives, length-prefixed UTF-8 strings and length-prefixed
//! homogeneous arrays:
//!
//! ```text
//! offset 0: u16 message type
//! offset 2: payload
//! string:   u32 byte length, then that many UTF-8 bytes
//! array:    i32 element count, then each element in order
//! ```
//!
//! The set of supported kinds is closed by the [`Encode`] and [`Decode`]
//! traits, so asking the codec for a kind it cannot represent fails to compile
//! instead of failing at runtime.

use thiserror::Error;

/// Reasons an inbound packet can fail to decode
///
/// Every variant is local to the offending datagram. Callers on the receive
/// path drop the datagram and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of packet: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("negative array length {0}")]
    NegativeLength(i32),
    #[error("unknown message type {0}")]
    UnknownMessageType(u16),
}

/// A value with a fixed little-endian wire representation
pub trait Encode {
    /// Appends the wire bytes of `self` to `buf`
    fn encode(&self, buf: &mut Vec<u8>);
}

/// A value that can be read back from its wire representation
pub trait Decode: Sized {
    /// Reads one value at the reader's cursor
    ///
    /// Implementations may leave the cursor anywhere on error;
    /// [`PacketReader::read`] rewinds it.
    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError>;
}

macro_rules! impl_le_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }
            }

            impl Decode for $ty {
                fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
                    let bytes = reader.take_array::<{ std::mem::size_of::<$ty>() }>()?;
                    Ok(<$ty>::from_le_bytes(bytes))
                }
            }
        )*
    };
}

impl_le_number!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Encode for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(u8::from(*self));
    }
}

impl Decode for bool {
    /// Any non-zero byte reads as `true`
    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let [byte] = reader.take_array::<1>()?;
        Ok(byte != 0)
    }
}

/// A single UTF-16 code unit, two bytes on the wire
///
/// Unlike `char`, a code unit may be half of a surrogate pair, which is why
/// conversion to `char` is fallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CodeUnit(pub u16);

impl CodeUnit {
    /// Returns the code unit for a character in the Basic Multilingual Plane
    pub fn from_char(c: char) -> Option<Self> {
        u16::try_from(u32::from(c)).ok().map(CodeUnit)
    }

    /// Returns the character this unit encodes on its own, if any
    pub fn to_char(self) -> Option<char> {
        char::from_u32(u32::from(self.0))
    }
}

impl From<u16> for CodeUnit {
    fn from(unit: u16) -> Self {
        CodeUnit(unit)
    }
}

impl Encode for CodeUnit {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.encode(buf);
    }
}

impl Decode for CodeUnit {
    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        u16::decode(reader).map(CodeUnit)
    }
}

impl Encode for str {
    /// Writes the UTF-8 byte length as a `u32` prefix, then the bytes
    ///
    /// # Panics
    /// If the string is longer than `u32::MAX` bytes.
    fn encode(&self, buf: &mut Vec<u8>) {
        let len = u32::try_from(self.len()).unwrap_or_else(|_| {
            panic!("string of {} bytes exceeds the u32 length prefix", self.len())
        });
        len.encode(buf);
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_str().encode(buf);
    }
}

impl Decode for String {
    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let len = u32::decode(reader)? as usize;
        let bytes = reader.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }
}

/// Cursor over one received datagram
///
/// The message-type tag is consumed on construction; reads continue from
/// offset 2.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    position: usize,
    message_type: u16,
}

impl<'a> PacketReader<'a> {
    /// Wraps a whole datagram and reads its message-type tag
    pub fn new(data: &'a [u8]) -> Result<Self, DecodeError> {
        let mut reader = PacketReader {
            data,
            position: 0,
            message_type: 0,
        };
        reader.message_type = reader.read()?;
        Ok(reader)
    }

    /// The tag read from the first two bytes
    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    /// Offset of the next unread byte, tag included
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes not yet read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Reads the next value of kind `T`
    ///
    /// On error the cursor is left where it was before the call.
    pub fn read<T: Decode>(&mut self) -> Result<T, DecodeError> {
        self.rewind_on_error(T::decode)
    }

    /// Reads an `i32` element count followed by that many `T` values
    pub fn read_array<T: Decode>(&mut self) -> Result<Vec<T>, DecodeError> {
        self.rewind_on_error(|reader| {
            let count: i32 = reader.read()?;
            let count = usize::try_from(count).map_err(|_| DecodeError::NegativeLength(count))?;

            // Every element takes at least one byte, so the remaining length
            // bounds the allocation a hostile count can trigger.
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(T::decode(reader)?);
            }
            Ok(items)
        })
    }

    fn rewind_on_error<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let start = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = start;
        }
        result
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::UnexpectedEnd {
                needed: len,
                remaining,
            });
        }

        let data: &'a [u8] = self.data;
        let slice = &data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Growable buffer for one outbound packet
///
/// The message-type tag is written on construction.
#[derive(Debug, Clone)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    /// Starts a packet with the given message-type tag
    pub fn new(message_type: impl Into<u16>) -> Self {
        let mut writer = PacketWriter {
            buf: Vec::with_capacity(32),
        };
        writer.write(&message_type.into());
        writer
    }

    /// Appends the wire bytes of `value`
    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(&mut self.buf);
        self
    }

    /// Appends an `i32` element count followed by each element
    ///
    /// # Panics
    /// If `items` has more than `i32::MAX` elements.
    pub fn write_array<T: Encode>(&mut self, items: &[T]) -> &mut Self {
        let count = i32::try_from(items.len()).unwrap_or_else(|_| {
            panic!("array of {} elements exceeds the i32 length prefix", items.len())
        });
        self.write(&count);
        for item in items {
            self.write(item);
        }
        self
    }

    /// The packet built so far; does not reset the writer
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and returns the finished packet
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
