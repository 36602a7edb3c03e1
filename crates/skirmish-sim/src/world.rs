//! The authoritative world.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skirmish_persist::{PlayerRecord, SavedWorld};
use skirmish_protocol::{EnemyId, Input, PlayerId, ResumeToken, Snapshot};
use tracing::{debug, info, warn};

use crate::combat::resolve_swing;
use crate::config::{EnemyConfig, SimConfig};
use crate::entity::{Enemy, Player};
use crate::grid::{tile_center, CollisionGrid};
use crate::player::SwingTiming;
use crate::rng::Lcg;
use crate::{ai, player};

/// Salt for the enemy placement stream, so it differs from spawn sampling.
const ENEMY_SALT: u64 = 0x656E_656D_7931_3337;

/// Snapshots go out at roughly this rate regardless of the tick rate.
const SNAPSHOT_HZ: u32 = 30;

/// Default persistence interval in seconds of simulated time.
const DEFAULT_PERSIST_SECS: u32 = 10;

fn draw_aggro(cfg: &EnemyConfig, rng: &mut StdRng) -> f32 {
    if cfg.aggro_max > cfg.aggro_min {
        rng.random_range(cfg.aggro_min..cfg.aggro_max)
    } else {
        cfg.aggro_min
    }
}

/// Something that happened outside the simulation, queued for the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A connection finished its handshake as `player_id`. If the player
    /// already exists (a resumed ghost) only the name and token are updated.
    Join {
        player_id: PlayerId,
        name: String,
        spawn: Vec2,
        token: ResumeToken,
    },
    /// Latest input from a player. Overwrites any unconsumed input.
    Input { player_id: PlayerId, input: Input },
}

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Ticks completed, including this one.
    pub tick: u64,
    /// Broadcast a snapshot now.
    pub broadcast: bool,
    /// Write a save now.
    pub persist: bool,
}

/// All mutable game state. Only the simulation loop touches it.
pub struct World {
    seed: u64,
    tick_rate: u32,
    tick: u64,
    players: BTreeMap<PlayerId, Player>,
    enemies: Vec<Enemy>,
    grid: Arc<dyn CollisionGrid>,
    config: SimConfig,
    timing: SwingTiming,
    snapshot_every: u64,
    persist_every: u64,
}

impl World {
    /// Creates a world and spawns its enemy population.
    pub fn new(seed: u64, tick_rate: u32, grid: Arc<dyn CollisionGrid>, config: SimConfig) -> Self {
        let tick_rate = tick_rate.max(1);
        let mut world = Self {
            seed,
            tick_rate,
            tick: 0,
            players: BTreeMap::new(),
            enemies: Vec::new(),
            grid,
            timing: SwingTiming::new(&config.weapon, tick_rate),
            config,
            snapshot_every: u64::from((tick_rate / SNAPSHOT_HZ).max(1)),
            persist_every: u64::from(tick_rate) * u64::from(DEFAULT_PERSIST_SECS),
        };
        world.spawn_enemies();
        world
    }

    /// Sets how many seconds of simulated time pass between saves.
    pub fn set_persist_interval(&mut self, secs: u32) {
        self.persist_every = u64::from(self.tick_rate) * u64::from(secs.max(1));
    }

    fn spawn_enemies(&mut self) {
        let cfg = &self.config.enemy;
        let mut rng = StdRng::seed_from_u64(self.seed ^ ENEMY_SALT);
        let origin = self.grid.center();

        for i in 0..cfg.count {
            let Some((tx, ty)) =
                self.grid
                    .random_floor_tile_far_from(origin, cfg.spawn_min_distance, &mut rng)
            else {
                warn!("no floor left for enemies");
                break;
            };
            let aggro = draw_aggro(cfg, &mut rng);
            self.enemies.push(Enemy::new(
                EnemyId(i + 1),
                tile_center(tx, ty),
                aggro,
                Lcg::from_spawn(tx, ty),
                cfg,
            ));
        }
        debug!(count = self.enemies.len(), "enemies spawned");
    }

    /// Places an extra enemy at `pos` and returns its id, or `None` once
    /// enemy ids are exhausted. Used to stage encounters in tests.
    #[doc(hidden)]
    pub fn spawn_enemy_at(&mut self, pos: Vec2) -> Option<EnemyId> {
        let id = EnemyId(u32::try_from(self.enemies.len()).ok()?.checked_add(1)?);
        let cfg = &self.config.enemy;
        let tile = (pos / crate::grid::TILE_SIZE).floor();
        let mut rng = StdRng::seed_from_u64(self.seed ^ ENEMY_SALT ^ u64::from(id.0));
        let aggro = draw_aggro(cfg, &mut rng);
        self.enemies.push(Enemy::new(
            id,
            pos,
            aggro,
            Lcg::from_spawn(tile.x as i32, tile.y as i32),
            cfg,
        ));
        Some(id)
    }

    /// Applies one queued event.
    pub fn apply(&mut self, event: SimEvent) {
        match event {
            SimEvent::Join {
                player_id,
                name,
                spawn,
                token,
            } => {
                if let Some(existing) = self.players.get_mut(&player_id) {
                    debug!(%player_id, "player rejoined");
                    existing.name = name;
                    existing.token = Some(token);
                } else {
                    info!(%player_id, %name, x = spawn.x, y = spawn.y, "player joined");
                    let mut player = Player::new(player_id, name, spawn, &self.config.player);
                    player.token = Some(token);
                    self.players.insert(player_id, player);
                }
            }
            SimEvent::Input { player_id, input } => match self.players.get_mut(&player_id) {
                Some(player) => player.pending = Some(input),
                None => debug!(%player_id, "input for unknown player dropped"),
            },
        }
    }

    /// Advances the world by one tick.
    pub fn step(&mut self) -> TickReport {
        let dt = 1.0 / self.tick_rate as f32;
        let grid = self.grid.as_ref();

        for p in self.players.values_mut() {
            let swing = player::update(
                p,
                grid,
                &self.config.player,
                &self.config.weapon,
                self.timing,
                dt,
            );
            if let Some(swing) = swing {
                resolve_swing(&swing, &mut self.enemies, grid);
            }
        }

        for enemy in &mut self.enemies {
            ai::update(enemy, &mut self.players, grid, &self.config.enemy, dt);
        }

        self.tick += 1;
        TickReport {
            tick: self.tick,
            broadcast: self.tick % self.snapshot_every == 0,
            persist: self.tick % self.persist_every == 0,
        }
    }

    /// Public state of every player and enemy, dead ones included.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            players: self.players.values().map(Player::snapshot).collect(),
            enemies: self.enemies.iter().map(Enemy::snapshot).collect(),
        }
    }

    /// The persistable part of the world.
    pub fn to_saved(&self) -> SavedWorld {
        SavedWorld {
            seed: self.seed,
            tick: self.tick,
            players: self
                .players
                .values()
                .map(|p| PlayerRecord {
                    id: p.id,
                    name: p.name.clone(),
                    x: p.body.pos.x,
                    y: p.body.pos.y,
                    hp: p.vitals.hp,
                    stamina: p.stamina,
                    shield: p.vitals.shield,
                    facing: p.facing,
                    alive: p.vitals.alive,
                    token: p.token,
                })
                .collect(),
        }
    }

    /// Repopulates players from a save and restores the tick counter.
    ///
    /// Values are clamped to the configured limits. A player whose saved
    /// position is inside a wall is moved to its spawn point. Saves written
    /// for another seed are ignored.
    pub fn restore(&mut self, saved: SavedWorld) {
        if saved.seed != self.seed {
            warn!(saved_seed = saved.seed, seed = self.seed, "refusing save for another seed");
            return;
        }

        let cfg = &self.config.player;
        for record in saved.players {
            let mut pos = Vec2::new(record.x, record.y);
            if self.grid.collides_box(pos, cfg.half_extent) {
                pos = spawn_point(self.grid.as_ref(), self.seed, record.id, cfg.spawn_min_distance);
                debug!(player_id = %record.id, "saved position blocked, respawning");
            }

            let mut player = Player::new(record.id, record.name, pos, cfg);
            player.token = record.token;
            player.facing = record.facing;
            player.stamina = record.stamina.clamp(0.0, cfg.max_stamina);
            player.vitals.shield = record.shield.max(0.0);
            player.vitals.hp = record.hp.clamp(0.0, cfg.max_hp);
            player.vitals.alive = record.alive && player.vitals.hp > 0.0;
            if !player.vitals.alive {
                player.vitals.hp = 0.0;
            }
            self.players.insert(record.id, player);
        }
        self.tick = self.tick.max(saved.tick);
        info!(tick = self.tick, players = self.players.len(), "world restored");
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn grid(&self) -> &dyn CollisionGrid {
        self.grid.as_ref()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

/// Deterministic spawn position for `player_id`.
///
/// The same seed and id always give the same point, so a player that joins
/// again after a reload lands where it first did.
pub fn spawn_point(grid: &dyn CollisionGrid, seed: u64, player_id: PlayerId, min_distance: f32) -> Vec2 {
    let mut rng = StdRng::seed_from_u64(seed ^ player_id.0.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    match grid.random_floor_tile_far_from(grid.center(), min_distance, &mut rng) {
        Some((tx, ty)) => tile_center(tx, ty),
        None => grid.center(),
    }
}
