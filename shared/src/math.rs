use std::ops::{Add, AddAssign, Mul};

use crate::codec::{Decode, DecodeError, Encode, PacketReader};

/// Represents a vector in 2D space.
///
/// On the wire a vector is two consecutive `f32`s, `x` then `y`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    /// Creates a new vector
    pub const fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, other: Vector2) {
        *self = *self + other;
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;

    fn mul(self, scalar: f32) -> Vector2 {
        Vector2::new(self.x * scalar, self.y * scalar)
    }
}

impl Encode for Vector2 {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.x.encode(buf);
        self.y.encode(buf);
    }
}

impl Decode for Vector2 {
    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let x = reader.read()?;
        let y = reader.read()?;
        Ok(Vector2 { x, y })
    }
}
