//! Per-peer session state
//!
//! A session is created when a connect request is accepted and lives in the
//! connection table until the peer disconnects. Its id and name never change;
//! only the position moves.

use shared::Vector2;

/// Server-side record of one connected peer
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: u64,
    name: String,
    position: Vector2,
}

impl Session {
    /// Creates a session at the origin
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: Vector2::ZERO,
        }
    }

    /// Returns the id assigned when the session was accepted
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the display name resolved at connect time
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the accumulated position
    pub fn position(&self) -> Vector2 {
        self.position
    }

    /// Accumulates `direction * speed` onto the current position
    pub fn apply_move(&mut self, direction: Vector2, speed: f32) {
        self.position += direction * speed;
    }
}

/// Hands out session ids
///
/// Ids increase monotonically from the initial value and are never reused for
/// the lifetime of the allocator. The dispatcher owns exactly one allocator,
/// created when the server starts. Once `u64::MAX` has been handed out the
/// allocator is exhausted and returns `None`.
#[derive(Debug)]
pub struct SessionIdAllocator {
    next_id: Option<u64>,
}

impl SessionIdAllocator {
    /// Creates an allocator whose first id is 0
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an allocator whose first id is `first_id`
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: Some(first_id),
        }
    }

    /// Returns a fresh id, or `None` if every id has been used
    pub fn allocate(&mut self) -> Option<u64> {
        let id = self.next_id?;
        self.next_id = id.checked_add(1);
        Some(id)
    }

    /// The id the next call to [`allocate`](Self::allocate) will return
    pub fn peek(&self) -> Option<u64> {
        self.next_id
    }
}

impl Default for SessionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
