//! Crash-tolerant persistence for Skirmish.
//!
//! Only players are saved. Enemies are respawned deterministically from the
//! seed, so a save file is just the seed, the tick counter and one record
//! per player.
//!
//! A save is only ever applied to a world with the same seed: [`Store::load`]
//! ignores a file written for any other seed.
//!
//! # File layout
//!
//! ```text
//! SKIRMISH-SAVE 1
//! seed=8812
//! tick=36000
//! player id=1 name=Sir%20Lance x=512.5 y=300 hp=75 st=100 sh=0 facing=2 alive=1
//! end
//! ```

mod error;
mod format;
mod store;

pub use error::PersistError;
pub use format::{decode, encode, PlayerRecord, SavedWorld, SAVE_MAGIC};
pub use store::Store;
