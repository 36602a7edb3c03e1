//! The well-known save file on disk.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{decode, encode, PersistError, SavedWorld};

/// A save file at a fixed path.
///
/// Methods are blocking; async callers run them on a blocking thread.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `world` to `<path>.tmp`, then renames it over `<path>`. A crash
    /// mid-write leaves the previous save intact.
    pub fn save(&self, world: &SavedWorld) -> Result<(), PersistError> {
        let tmp = self.tmp_path();
        let io_err = |source: io::Error| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&tmp, encode(world)).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!(
            path = %self.path.display(),
            tick = world.tick,
            players = world.players.len(),
            "world saved"
        );
        Ok(())
    }

    /// Reads the save file if it belongs to `seed`.
    ///
    /// Returns `Ok(None)` when there is no file or when it was written for a
    /// different seed.
    pub fn load(&self, seed: u64) -> Result<Option<SavedWorld>, PersistError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no save file");
                return Ok(None);
            }
            Err(source) => {
                return Err(PersistError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let saved = decode(&text)?;
        if saved.seed != seed {
            info!(
                path = %self.path.display(),
                saved_seed = saved.seed,
                seed,
                "save file belongs to another seed, ignoring"
            );
            return Ok(None);
        }

        info!(
            path = %self.path.display(),
            tick = saved.tick,
            players = saved.players.len(),
            "save file loaded"
        );
        Ok(Some(saved))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}
