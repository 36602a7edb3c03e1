//! The session registry: tracks every player the server knows about.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself; it uses a plain
//! `HashMap`. The server wraps it in a mutex shared by the handshake
//! handlers and the simulation driver. All operations are synchronous and
//! never block on I/O: frames go into bounded outboxes with `try_send` and
//! each connection's writer task does the actual writing.

use std::collections::HashMap;
use std::sync::Arc;

use skirmish_protocol::{PlayerId, ResumeToken};
use skirmish_transport::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::{Outbound, Outbox, PlayerIdAllocator, Session, SessionError, SessionState};

/// Result of [`SessionRegistry::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// The id the connection now plays as.
    pub player_id: PlayerId,
    /// `true` if an existing ghost was taken over.
    pub resumed: bool,
    /// Display name for the session.
    pub name: String,
    /// What the client must present to resume this player later.
    pub token: ResumeToken,
}

/// A fresh, unguessable resume token.
fn new_token() -> ResumeToken {
    ResumeToken(rand::random())
}

/// Registry of all sessions, connected and ghost.
///
/// ## Lifecycle
///
/// ```text
/// claim() ──→ attach() ──→ disconnect() ──→ claim(id, token) ──→ attach()
///    │            │              │                  │
///    ▼            ▼              ▼                  ▼
/// [Connected] [broadcasts]    [Ghost]          [Connected]
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<PlayerId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a player restored from persistence. It has no connection
    /// until a client resumes it with `token`. A record saved without a
    /// token gets a fresh one nobody holds, so it cannot be resumed.
    pub fn register_ghost(
        &mut self,
        player_id: PlayerId,
        name: String,
        token: Option<ResumeToken>,
    ) {
        self.sessions.insert(
            player_id,
            Session {
                player_id,
                name,
                token: token.unwrap_or_else(new_token),
                state: SessionState::Ghost,
                outbox: None,
            },
        );
    }

    /// Binds `conn` to a player.
    ///
    /// When `requested` names a ghost and carries its token, the ghost is
    /// resumed and keeps its name unless a new one is given. Any other
    /// request (unknown id, wrong token, or an id some other connection
    /// already owns) gets a fresh id from the allocator. Fresh players
    /// without a name are called `player-<n>`.
    pub fn claim(
        &mut self,
        requested: Option<(PlayerId, ResumeToken)>,
        conn: ConnectionId,
        name: Option<String>,
        allocator: &PlayerIdAllocator,
    ) -> Claim {
        let requested = match requested {
            Some((id, token)) => self.sessions.get_mut(&id).zip(Some(token)),
            None => None,
        };
        if let Some((session, token)) = requested {
            if session.token != token {
                warn!(player_id = %session.player_id, %conn, "resume token mismatch, allocating a fresh id");
            } else if !session.is_connected() {
                session.state = SessionState::Connected { conn };
                session.outbox = None;
                if let Some(name) = name {
                    session.name = name;
                }
                info!(player_id = %session.player_id, %conn, "ghost session resumed");
                return Claim {
                    player_id: session.player_id,
                    resumed: true,
                    name: session.name.clone(),
                    token: session.token,
                };
            } else {
                debug!(player_id = %session.player_id, %conn, "requested id is connected, allocating a fresh one");
            }
        }

        let player_id = allocator.allocate();
        let name = name.unwrap_or_else(|| format!("player-{}", player_id.0));
        let token = new_token();
        self.sessions.insert(
            player_id,
            Session {
                player_id,
                name: name.clone(),
                token,
                state: SessionState::Connected { conn },
                outbox: None,
            },
        );
        info!(%player_id, %conn, "session created");

        Claim {
            player_id,
            resumed: false,
            name,
            token,
        }
    }

    /// Installs the outbound channel for a connected session. From now on
    /// the session receives broadcasts.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no such player
    /// - [`SessionError::StaleConnection`]: `conn` no longer owns the session
    pub fn attach(
        &mut self,
        player_id: PlayerId,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        if session.connection() != Some(conn) {
            return Err(SessionError::StaleConnection { player_id, conn });
        }
        session.outbox = Some(outbox);
        debug!(%player_id, %conn, "session attached");
        Ok(())
    }

    /// Turns the session into a ghost, dropping its outbox.
    ///
    /// Returns `Ok(false)` when `conn` no longer owns the session (a newer
    /// connection resumed it first); the session is left untouched.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(
        &mut self,
        player_id: PlayerId,
        conn: ConnectionId,
    ) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        if session.connection() != Some(conn) {
            debug!(%player_id, %conn, "ignoring disconnect from stale connection");
            return Ok(false);
        }
        session.state = SessionState::Ghost;
        session.outbox = None;
        info!(%player_id, %conn, "player disconnected, session kept as ghost");
        Ok(true)
    }

    /// Queues `frame` on every attached outbox. Returns how many outboxes
    /// accepted it.
    ///
    /// An outbox that is full (the peer stopped reading) or whose writer
    /// task has gone away is dropped. Its writer then finishes and the
    /// connection handler turns the session into a ghost.
    pub fn broadcast(&mut self, frame: &Arc<str>) -> usize {
        let mut sent = 0;
        for session in self.sessions.values_mut() {
            let Some(outbox) = &session.outbox else {
                continue;
            };
            match outbox.try_send(Outbound::Text(Arc::clone(frame))) {
                Ok(()) => sent += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(player_id = %session.player_id, "outbox full, dropping stalled connection");
                    session.outbox = None;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(player_id = %session.player_id, "writer gone, dropping outbox");
                    session.outbox = None;
                }
            }
        }
        sent
    }

    /// Asks every attached writer to close its connection and drops the
    /// outboxes. Sessions keep their state; the readers see EOF and
    /// disconnect normally.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for session in self.sessions.values_mut() {
            if let Some(outbox) = session.outbox.take() {
                if outbox.try_send(Outbound::Close).is_ok() {
                    closed += 1;
                }
            }
        }
        info!(closed, "closing all connections");
        closed
    }

    /// Number of sessions bound to a live connection.
    pub fn connected_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_connected()).count()
    }

    /// Looks up a session by player ID.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Number of sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
