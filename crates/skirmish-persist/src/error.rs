//! Error types for the persistence layer.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while reading or writing a save file.
///
/// None of these are fatal to a running server: a failed load leaves the
/// world freshly initialized and a failed save is retried on the next
/// interval.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Reading, writing or renaming the file failed.
    #[error("save file I/O failed for {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file does not start with the expected magic line.
    #[error("not a save file (first line {0:?})")]
    BadMagic(String),

    /// The `seed=` line is missing or unreadable. Without it the file
    /// cannot be matched against the running world.
    #[error("save file has no readable seed")]
    MissingSeed,
}
