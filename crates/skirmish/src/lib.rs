//! # Skirmish
//!
//! Authoritative fixed-tick server for a top-down multiplayer action game.
//!
//! Clients connect over TCP and speak a line-oriented text protocol. Each
//! one gets a handshake (seed, tick rate, the map) and then a snapshot of
//! the world about thirty times a second, while its `INPUT` lines steer
//! its character. A single simulation task owns the world; everything
//! else only queues events for it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skirmish::prelude::*;
//!
//! # async fn start() -> Result<(), SkirmishError> {
//! let server = SkirmishServer::builder()
//!     .bind("0.0.0.0:7777")
//!     .build()
//!     .await?;
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! server.run(shutdown).await
//! # }
//! ```

mod config;
mod driver;
mod error;
mod handler;
mod server;

pub use config::{MapConfig, NetworkConfig, ServerConfig, TickSettings};
pub use error::SkirmishError;
pub use server::{SkirmishServer, SkirmishServerBuilder};

/// Convenience re-exports: `use skirmish::prelude::*;`
pub mod prelude {
    pub use crate::{ServerConfig, SkirmishError, SkirmishServer, SkirmishServerBuilder};
    pub use skirmish_protocol::{
        ClientMessage, Facing, Input, PlayerId, ResumeToken, ServerMessage, Snapshot,
        PROTOCOL_VERSION,
    };
    pub use skirmish_sim::SimConfig;
}
