//! Session types: the connection-side record of one player.

use std::sync::Arc;

use skirmish_protocol::{PlayerId, ResumeToken};
use skirmish_transport::ConnectionId;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Outbound frames
// ---------------------------------------------------------------------------

/// A frame queued for one connection's writer task.
///
/// Snapshot text is encoded once per broadcast and shared between every
/// outbox as an `Arc<str>`.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A complete line or block, written with a single `send`.
    Text(Arc<str>),
    /// Close the connection after everything queued before it is written.
    Close,
}

/// Frames a connection may have queued before it counts as stalled:
/// about two seconds of snapshots plus the handshake.
pub const OUTBOX_CAPACITY: usize = 64;

/// Sending half of a connection's outbound queue. The writer task owns the
/// receiving half and is the only code that writes to the socket.
pub type Outbox = mpsc::Sender<Outbound>;

/// Receiving half of an [`Outbox`].
pub type OutboxReceiver = mpsc::Receiver<Outbound>;

/// A new outbound queue holding at most [`OUTBOX_CAPACITY`] frames.
pub fn outbox() -> (Outbox, OutboxReceiver) {
    mpsc::channel(OUTBOX_CAPACITY)
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of a session.
///
/// ```text
///   Connected ──(disconnect)──→ Ghost
///       ↑                         │
///       └──────(claim + resume)───┘
/// ```
///
/// Ghost sessions are never removed: the player stays in the world and can
/// be resumed by a later connection that presents the same id and token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Bound to a live connection.
    Connected { conn: ConnectionId },
    /// No connection. The player still exists in the world.
    Ghost,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single player's connection record.
#[derive(Debug)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,
    /// Sanitized display name.
    pub name: String,
    /// Secret required to resume the player after a disconnect.
    pub token: ResumeToken,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Present once the handshake frames are queued; `None` for ghosts and
    /// for connections still in the handshake.
    pub(crate) outbox: Option<Outbox>,
}

impl Session {
    /// `true` while a connection owns this session.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected { .. })
    }

    /// `true` once the session receives broadcasts.
    pub fn is_attached(&self) -> bool {
        self.outbox.is_some()
    }

    /// The connection bound to this session, if any.
    pub fn connection(&self) -> Option<ConnectionId> {
        match self.state {
            SessionState::Connected { conn } => Some(conn),
            SessionState::Ghost => None,
        }
    }
}
