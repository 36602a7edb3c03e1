//! Enemy behaviour: chase, bite, wander.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use glam::Vec2;
use skirmish_protocol::PlayerId;
use tracing::info;

use crate::config::EnemyConfig;
use crate::entity::{Enemy, Player};
use crate::grid::CollisionGrid;
use crate::movement::move_body;

/// Advances one live enemy by one tick.
///
/// The target is the nearest live player. Out of aggro range (or with no
/// players at all) the enemy wanders; inside it the enemy closes in at full
/// speed; inside melee range it stands and deals damage every tick.
pub(crate) fn update(
    enemy: &mut Enemy,
    players: &mut BTreeMap<PlayerId, Player>,
    grid: &dyn CollisionGrid,
    config: &EnemyConfig,
    dt: f32,
) {
    if !enemy.vitals.alive {
        return;
    }

    let nearest = players
        .values_mut()
        .filter(|p| p.vitals.alive)
        .map(|p| {
            let d = p.body.pos.distance(enemy.body.pos);
            (p, d)
        })
        .fold(None::<(&mut Player, f32)>, |best, (p, d)| match best {
            Some((bp, bd)) if bd <= d => Some((bp, bd)),
            _ => Some((p, d)),
        });

    match nearest {
        Some((target, dist)) if dist <= config.melee_range => {
            target.vitals.apply_damage(config.damage_per_second * dt);
            if !target.vitals.alive {
                info!(player_id = %target.id, enemy = %enemy.id, "player killed");
            }
        }
        Some((target, dist)) if dist <= enemy.aggro_radius => {
            let dir = (target.body.pos - enemy.body.pos).normalize_or_zero();
            move_body(grid, &mut enemy.body.pos, enemy.body.half_extent, dir * enemy.body.speed * dt);
        }
        _ => wander(enemy, grid, config, dt),
    }
}

fn wander(enemy: &mut Enemy, grid: &dyn CollisionGrid, config: &EnemyConfig, dt: f32) {
    if enemy.wander_ticks == 0 {
        enemy.wander_ticks = enemy
            .lcg
            .next_hold(config.wander_hold_min, config.wander_hold_max);
        let angle = enemy.lcg.next_unit() * TAU;
        enemy.wander_dir = Vec2::from_angle(angle);
    }
    enemy.wander_ticks -= 1;

    let speed = enemy.body.speed * config.wander_speed_fraction;
    move_body(grid, &mut enemy.body.pos, enemy.body.half_extent, enemy.wander_dir * speed * dt);
}
