//! Axis-by-axis movement against the collision grid.
//!
//! A move is resolved on x first, then on y. When the full step on an axis
//! is blocked the body creeps forward one unit at a time until the next
//! unit would collide. Moving diagonally into a wall therefore slides along
//! it instead of stopping dead.

use glam::Vec2;

use crate::grid::CollisionGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn unit(self) -> Vec2 {
        match self {
            Axis::X => Vec2::X,
            Axis::Y => Vec2::Y,
        }
    }
}

/// Moves `pos` by `delta` along `axis`. Returns `true` if a wall stopped
/// the move short.
pub fn move_axis(
    grid: &dyn CollisionGrid,
    pos: &mut Vec2,
    half_extent: f32,
    axis: Axis,
    delta: f32,
) -> bool {
    if delta == 0.0 {
        return false;
    }
    let unit = axis.unit();
    let target = *pos + unit * delta;
    if !grid.collides_box(target, half_extent) {
        *pos = target;
        return false;
    }

    let dir = unit * delta.signum();
    let mut remaining = delta.abs();
    while remaining > 0.0 {
        let stride = remaining.min(1.0);
        let candidate = *pos + dir * stride;
        if grid.collides_box(candidate, half_extent) {
            break;
        }
        *pos = candidate;
        remaining -= stride;
    }
    true
}

/// Moves `pos` by `delta`, x axis first.
pub fn move_body(grid: &dyn CollisionGrid, pos: &mut Vec2, half_extent: f32, delta: Vec2) {
    move_axis(grid, pos, half_extent, Axis::X, delta.x);
    move_axis(grid, pos, half_extent, Axis::Y, delta.y);
}
