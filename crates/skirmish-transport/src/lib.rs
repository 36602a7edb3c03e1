//! Transport abstraction layer for Skirmish.
//!
//! Provides the [`Transport`] and [`Connection`] traits and the one
//! implementation the server speaks: newline-framed text over TCP
//! ([`TcpLineTransport`]).
//!
//! The transport knows nothing about message contents. A "message" here is
//! a chunk of text the caller hands to [`Connection::send`] (one line or a
//! whole multi-line block) or one line handed back by [`Connection::recv`].

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{LineConnection, TcpLineTransport, MAX_LINE_BYTES};

use std::fmt;

/// Number the transport gives each accepted socket, unique for the life of
/// the process. Shown as `conn-<n>` in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listening side: hands out one [`Connection`] per client.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Next accepted client. Errors on a single accept are the caller's to
    /// log and skip.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops listening. Connections already accepted stay up.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One client's line stream.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes `text` to the peer as one uninterrupted unit.
    ///
    /// Two concurrent `send` calls on the same connection never interleave
    /// their bytes. A trailing newline is appended when `text` lacks one.
    async fn send(&self, text: &str) -> Result<(), Self::Error>;

    /// Next line from the peer, terminator stripped. `Ok(None)` at EOF.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Shuts down the write half; a pending `recv` then ends with EOF or an
    /// error depending on the peer.
    async fn close(&self) -> Result<(), Self::Error>;

    /// `false` once the connection has been closed or a write failed.
    fn is_open(&self) -> bool;

    fn id(&self) -> ConnectionId;
}
