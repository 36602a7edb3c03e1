//! Player id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use skirmish_protocol::PlayerId;

/// Hands out player ids: positive, unique, never reused within a session.
///
/// One per server, shared by reference between handler tasks.
#[derive(Debug)]
pub struct PlayerIdAllocator {
    next: AtomicU64,
}

impl PlayerIdAllocator {
    /// Creates an allocator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh id.
    pub fn allocate(&self) -> PlayerId {
        PlayerId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Makes sure no future id is `<= id`. Used after loading persisted
    /// players so restored ids are never handed out again.
    pub fn advance_past(&self, id: PlayerId) {
        self.next.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }

    /// The id the next call to [`allocate`](Self::allocate) would return.
    pub fn peek(&self) -> PlayerId {
        PlayerId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for PlayerIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
