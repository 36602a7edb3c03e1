//! Melee hit resolution.
//!
//! A sword swing is a line segment from the attacker's position along its
//! facing, thickened into a capsule by half the blade width plus the
//! target's radius. A swing stays active for several ticks and is tested
//! every one of them; the swing tag makes sure each enemy is damaged by a
//! given swing at most once.

use glam::Vec2;
use skirmish_protocol::PlayerId;
use tracing::debug;

use crate::entity::Enemy;
use crate::grid::CollisionGrid;

/// Identifies one swing of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwingTag {
    pub player_id: PlayerId,
    pub swing_seq: u32,
}

/// An active swing, as produced by a player's update for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Swing {
    pub tag: SwingTag,
    pub origin: Vec2,
    /// Unit vector along the attacker's facing.
    pub dir: Vec2,
    pub reach: f32,
    pub width: f32,
    pub damage: f32,
    pub knockback: f32,
}

/// Whether `center` lies within `radius` of the segment `start..end`.
pub fn capsule_hits(start: Vec2, end: Vec2, radius: f32, center: Vec2) -> bool {
    let seg = end - start;
    let len_sq = seg.length_squared();
    let t = if len_sq > 0.0 {
        ((center - start).dot(seg) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = start + seg * t;
    closest.distance_squared(center) <= radius * radius
}

/// Applies `swing` to every live enemy it touches that this swing has not
/// hit yet. Returns the number of enemies hit.
///
/// A hit enemy is pushed `knockback` units along the swing, unless that
/// would put it inside a wall.
pub fn resolve_swing(swing: &Swing, enemies: &mut [Enemy], grid: &dyn CollisionGrid) -> usize {
    let end = swing.origin + swing.dir * swing.reach;
    let mut hits = 0;

    for enemy in enemies.iter_mut() {
        if !enemy.vitals.alive || enemy.last_hit == Some(swing.tag) {
            continue;
        }
        let radius = swing.width / 2.0 + enemy.radius;
        if !capsule_hits(swing.origin, end, radius, enemy.body.pos) {
            continue;
        }

        enemy.last_hit = Some(swing.tag);
        enemy.vitals.apply_damage(swing.damage);
        hits += 1;

        let pushed = enemy.body.pos + swing.dir * swing.knockback;
        if !grid.collides_box(pushed, enemy.body.half_extent) {
            enemy.body.pos = pushed;
        }

        debug!(
            player_id = %swing.tag.player_id,
            enemy = %enemy.id,
            hp = enemy.vitals.hp,
            alive = enemy.vitals.alive,
            "swing hit"
        );
    }
    hits
}
