//! Error types for the session layer.

use skirmish_protocol::PlayerId;
use skirmish_transport::ConnectionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The session is now bound to a different connection (the player
    /// reconnected, or the connection was already dropped).
    #[error("connection {conn} no longer owns the session of player {player_id}")]
    StaleConnection {
        player_id: PlayerId,
        conn: ConnectionId,
    },
}
