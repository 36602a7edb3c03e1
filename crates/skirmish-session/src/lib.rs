//! Connection-side bookkeeping for Skirmish.
//!
//! This crate tracks which player belongs to which live connection:
//!
//! 1. **Identity**: player ids come from a [`PlayerIdAllocator`] owned by
//!    the server for the lifetime of the session. Each session also holds a
//!    random resume token; only a client presenting it takes a ghost back.
//! 2. **Session tracking**: the [`SessionRegistry`] knows who is connected
//!    and who is a ghost (disconnected, but still part of the world).
//! 3. **Fan-out**: every connected session owns an [`Outbox`], the only
//!    path by which frames reach that connection's writer task. Outboxes
//!    are bounded; a connection that falls [`OUTBOX_CAPACITY`] frames
//!    behind loses its outbox and is dropped.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)     ← handshake handler claims ids, driver broadcasts snapshots
//!     ↕
//! Session Layer (this crate)  ← player identity and connection state
//!     ↕
//! Protocol / Transport (below) ← PlayerId, ConnectionId
//! ```
//!
//! The registry never touches simulation state. A player's world entity
//! outlives its connection; only the connection side is tracked here.

mod allocator;
mod error;
mod registry;
mod session;

pub use allocator::PlayerIdAllocator;
pub use error::SessionError;
pub use registry::{Claim, SessionRegistry};
pub use session::{
    outbox, Outbound, Outbox, OutboxReceiver, Session, SessionState, OUTBOX_CAPACITY,
};
