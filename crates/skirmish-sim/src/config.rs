//! Stat tables consumed by the simulation.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. Durations are in seconds and speeds in world units per second;
//! the world converts them to ticks once at construction.

use serde::{Deserialize, Serialize};

/// All simulation tunables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub weapon: WeaponConfig,
    #[serde(default)]
    pub enemy: EnemyConfig,
}

/// Player stats.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub max_hp: f32,
    /// Shield a fresh player starts with.
    pub shield: f32,
    pub max_stamina: f32,
    pub speed: f32,
    pub half_extent: f32,
    /// Speed multiplier while sprinting.
    pub sprint_multiplier: f32,
    /// Stamina drained per second of sprinting.
    pub sprint_drain: f32,
    /// Stamina regained per second when not sprinting.
    pub stamina_regen: f32,
    /// Minimum distance of a spawn point from the map centre.
    pub spawn_min_distance: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            shield: 25.0,
            max_stamina: 100.0,
            speed: 150.0,
            half_extent: 10.0,
            sprint_multiplier: 2.0,
            sprint_drain: 35.0,
            stamina_regen: 20.0,
            spawn_min_distance: 0.0,
        }
    }
}

/// The sword every player carries.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub reach: f32,
    /// Blade width; half of it thickens the hit capsule.
    pub width: f32,
    pub damage: f32,
    pub cooldown_secs: f32,
    /// How long one swing stays active and keeps testing for hits.
    pub duration_secs: f32,
    pub stamina_cost: f32,
    pub knockback: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            reach: 42.0,
            width: 16.0,
            damage: 25.0,
            cooldown_secs: 0.40,
            duration_secs: 0.15,
            stamina_cost: 15.0,
            knockback: 10.0,
        }
    }
}

/// Enemy population and stats.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Enemies spawned when the world is created. They never respawn.
    pub count: u32,
    pub max_hp: f32,
    pub speed: f32,
    /// Fraction of `speed` used while wandering.
    pub wander_speed_fraction: f32,
    pub melee_range: f32,
    /// Damage dealt continuously while a player is in melee range.
    pub damage_per_second: f32,
    /// Radius used by the sword hit test.
    pub radius: f32,
    pub half_extent: f32,
    pub aggro_min: f32,
    pub aggro_max: f32,
    pub wander_hold_min: u32,
    pub wander_hold_max: u32,
    pub spawn_min_distance: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            count: 24,
            max_hp: 60.0,
            speed: 100.0,
            wander_speed_fraction: 0.35,
            melee_range: 24.0,
            damage_per_second: 12.0,
            radius: 10.0,
            half_extent: 10.0,
            aggro_min: 220.0,
            aggro_max: 360.0,
            wander_hold_min: 15,
            wander_hold_max: 35,
            spawn_min_distance: 256.0,
        }
    }
}
