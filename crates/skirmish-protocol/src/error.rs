//! Error types for the protocol layer.
//!
//! Each crate in Skirmish defines its own error enum. A `ProtocolError`
//! always means a block on the wire was structurally broken; a single
//! malformed field never produces one (fields fall back to defaults).

/// Errors that can occur while reading a multi-line protocol block.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The header line of a block is missing a field or carries an
    /// impossible value (e.g. a map with zero width).
    #[error("invalid {block} header: {line:?}")]
    InvalidHeader { block: &'static str, line: String },

    /// A map row is shorter or longer than the header's width.
    #[error("map row {row} has {found} tiles, expected {expected}")]
    BadRow {
        row: u32,
        expected: u32,
        found: usize,
    },

    /// The source ended in the middle of a block.
    ///
    /// This is distinct from "no message available yet", which the
    /// `read_*` functions report as `Ok(None)`.
    #[error("stream ended inside {0} block")]
    UnexpectedEof(&'static str),

    /// A line that does not belong at this point of the block.
    #[error("unexpected line in {block} block: {line:?}")]
    UnexpectedLine { block: &'static str, line: String },
}
