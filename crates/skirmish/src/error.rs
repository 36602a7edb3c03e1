//! Unified error type for the Skirmish server.

use skirmish_persist::PersistError;
use skirmish_protocol::ProtocolError;
use skirmish_session::SessionError;
use skirmish_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SkirmishError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (broken block on the wire).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown player, stale connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A persistence error (save file unreadable or unwritable).
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The config file is not valid TOML for [`crate::ServerConfig`].
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// Reading the config file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Rendering a frame into a string failed.
    #[error("frame formatting failed")]
    Format(#[from] std::fmt::Error),

    /// The simulation loop has stopped and accepts no more events.
    #[error("simulation is shutting down")]
    ShuttingDown,
}
