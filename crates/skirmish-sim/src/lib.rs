//! Authoritative world simulation for Skirmish.
//!
//! The [`World`] owns every player and enemy and is only ever mutated by
//! the simulation loop. Network code talks to it through [`SimEvent`]s
//! (queued by reader tasks, applied at the start of a tick) and reads it
//! back through [`World::snapshot`].
//!
//! # Determinism
//!
//! Two worlds built with the same seed, grid and config, fed the same
//! events at the same ticks, produce identical snapshots:
//!
//! - players are kept in a `BTreeMap`, so update order is fixed;
//! - enemy placement and aggro radii come from a `StdRng` seeded from the
//!   world seed;
//! - enemy wandering uses a private [`Lcg`] per enemy, seeded from its
//!   spawn tile.
//!
//! # Per-tick sequence
//!
//! ```text
//! apply(events)  →  players (move, swing)  →  enemies (chase, bite, wander)  →  tick += 1
//! ```

mod ai;
mod combat;
mod config;
mod entity;
mod grid;
mod movement;
mod player;
mod rng;
mod world;

pub use combat::{capsule_hits, resolve_swing, Swing, SwingTag};
pub use config::{EnemyConfig, PlayerConfig, SimConfig, WeaponConfig};
pub use entity::{Body, Enemy, Player, Vitals};
pub use grid::{tile_center, CollisionGrid, TileGrid, TILE_SIZE};
pub use movement::{move_axis, move_body, Axis};
pub use rng::Lcg;
pub use world::{spawn_point, SimEvent, TickReport, World};
