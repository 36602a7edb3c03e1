//! Wire protocol for Skirmish.
//!
//! This crate defines the "language" that clients and the server speak:
//! newline-terminated ASCII lines, some of which open multi-line blocks.
//!
//! - **Types** ([`Input`], [`Snapshot`], [`MapBlock`], [`ServerMessage`],
//!   [`ClientMessage`], ...): the messages that travel on the wire.
//! - **Codec** ([`parse_input`], [`write_snapshot`], [`read_map`], ...):
//!   how those messages are converted to and from text.
//! - **Names** ([`encode_name`], [`sanitize_name`]): keeping free-text
//!   display names from breaking the line framing.
//! - **Errors** ([`ProtocolError`]): what can go wrong while reading a block.
//!
//! # Architecture
//!
//! The protocol layer is pure: no I/O, no state. It sits between the
//! transport (raw lines) and the simulation (typed input and snapshots).
//!
//! ```text
//! Transport (lines) → Protocol (Input / Snapshot) → Simulation
//! ```

mod codec;
mod error;
mod name;
mod types;

pub use codec::{
    encode_snapshot, parse_client_line, parse_input, read_map, read_snapshot,
    write_map, write_snapshot, MAX_MAP_TILES,
};
pub use error::ProtocolError;
pub use name::{decode_name, encode_name, sanitize_name, MAX_NAME_CHARS};
pub use types::{
    ClientMessage, EnemyId, EnemySnapshot, Facing, Input, MapBlock, PlayerId,
    PlayerSnapshot, ResumeToken, ServerMessage, Snapshot, PROTOCOL_VERSION,
};
