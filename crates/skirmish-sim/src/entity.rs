//! Players and enemies.
//!
//! Both kinds share the same physical layout ([`Body`] and [`Vitals`]) and
//! carry their own behaviour state next to it. Behaviour lives in plain
//! functions (`player::update`, `ai::update`) chosen by kind, not in a
//! trait.

use glam::Vec2;
use skirmish_protocol::{
    EnemyId, EnemySnapshot, Facing, Input, PlayerId, PlayerSnapshot, ResumeToken,
};

use crate::combat::SwingTag;
use crate::config::{EnemyConfig, PlayerConfig};
use crate::rng::Lcg;

// ---------------------------------------------------------------------------
// Shared parts
// ---------------------------------------------------------------------------

/// Health pool with a shield that absorbs damage first.
#[derive(Debug, Clone, PartialEq)]
pub struct Vitals {
    pub hp: f32,
    pub max_hp: f32,
    pub shield: f32,
    pub alive: bool,
}

impl Vitals {
    pub fn new(max_hp: f32, shield: f32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            shield: shield.max(0.0),
            alive: max_hp > 0.0,
        }
    }

    /// Applies `amount` damage, shield first. Health is clamped at zero and
    /// `alive` flips to false exactly when it reaches zero.
    ///
    /// Returns the damage actually absorbed by shield and health.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        if !self.alive || amount <= 0.0 {
            return 0.0;
        }
        let absorbed = self.shield.min(amount);
        self.shield -= absorbed;
        let rest = amount - absorbed;
        let taken = self.hp.min(rest);
        self.hp -= taken;
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.alive = false;
        }
        absorbed + taken
    }
}

/// Position and footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub pos: Vec2,
    /// Half the side of the collision box.
    pub half_extent: f32,
    /// Base speed in units per second.
    pub speed: f32,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub body: Body,
    pub vitals: Vitals,
    pub facing: Facing,
    pub stamina: f32,
    pub max_stamina: f32,
    pub sprinting: bool,
    /// Ticks until a new swing may start.
    pub attack_cooldown: u32,
    /// Ticks the current swing stays active.
    pub attack_remaining: u32,
    /// Bumped on every new swing.
    pub swing_seq: u32,
    /// Latest unconsumed input. A newer input overwrites it.
    pub pending: Option<Input>,
    /// Resume secret of the owning session. Only carried through saves.
    pub token: Option<ResumeToken>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, pos: Vec2, config: &PlayerConfig) -> Self {
        Self {
            id,
            name,
            body: Body {
                pos,
                half_extent: config.half_extent,
                speed: config.speed,
            },
            vitals: Vitals::new(config.max_hp, config.shield),
            facing: Facing::EAST,
            stamina: config.max_stamina,
            max_stamina: config.max_stamina,
            sprinting: false,
            attack_cooldown: 0,
            attack_remaining: 0,
            swing_seq: 0,
            pending: None,
            token: None,
        }
    }

    /// The tag of the player's current swing.
    pub fn swing_tag(&self) -> SwingTag {
        SwingTag {
            player_id: self.id,
            swing_seq: self.swing_seq,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            x: self.body.pos.x,
            y: self.body.pos.y,
            hp: self.vitals.hp,
            stamina: self.stamina,
            shield: self.vitals.shield,
            facing: self.facing,
            alive: self.vitals.alive,
            name: self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enemy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    pub body: Body,
    pub vitals: Vitals,
    /// Radius for the sword hit test.
    pub radius: f32,
    pub aggro_radius: f32,
    /// Ticks left before a new wander direction is picked.
    pub wander_ticks: u32,
    pub wander_dir: Vec2,
    pub lcg: Lcg,
    /// The last swing that hit this enemy.
    pub last_hit: Option<SwingTag>,
}

impl Enemy {
    pub fn new(id: EnemyId, pos: Vec2, aggro_radius: f32, lcg: Lcg, config: &EnemyConfig) -> Self {
        Self {
            id,
            body: Body {
                pos,
                half_extent: config.half_extent,
                speed: config.speed,
            },
            vitals: Vitals::new(config.max_hp, 0.0),
            radius: config.radius,
            aggro_radius,
            wander_ticks: 0,
            wander_dir: Vec2::ZERO,
            lcg,
            last_hit: None,
        }
    }

    pub fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            x: self.body.pos.x,
            y: self.body.pos.y,
            hp: self.vitals.hp,
            alive: self.vitals.alive,
        }
    }
}
