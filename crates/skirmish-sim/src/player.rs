//! Per-tick player update.

use std::f32::consts::FRAC_1_SQRT_2;

use glam::Vec2;
use skirmish_protocol::Facing;

use crate::combat::Swing;
use crate::config::{PlayerConfig, WeaponConfig};
use crate::entity::Player;
use crate::grid::CollisionGrid;
use crate::movement::move_body;

/// Weapon timings converted to ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SwingTiming {
    pub cooldown_ticks: u32,
    pub duration_ticks: u32,
}

impl SwingTiming {
    pub fn new(weapon: &WeaponConfig, tick_rate: u32) -> Self {
        let to_ticks = |secs: f32| ((secs * tick_rate as f32).round() as u32).max(1);
        Self {
            cooldown_ticks: to_ticks(weapon.cooldown_secs),
            duration_ticks: to_ticks(weapon.duration_secs),
        }
    }
}

/// Advances one live player by one tick.
///
/// Consumes the pending input (no input means standing still), moves,
/// updates stamina and facing, and ticks the attack timers. Returns the
/// swing to resolve this tick, if one is active.
pub(crate) fn update(
    player: &mut Player,
    grid: &dyn CollisionGrid,
    config: &PlayerConfig,
    weapon: &WeaponConfig,
    timing: SwingTiming,
    dt: f32,
) -> Option<Swing> {
    let input = player.pending.take().unwrap_or_default();
    if !player.vitals.alive {
        return None;
    }

    let dx = input.dx.clamp(-1, 1);
    let dy = input.dy.clamp(-1, 1);
    let moving = dx != 0 || dy != 0;
    let mut dir = Vec2::new(dx as f32, dy as f32);
    if dx != 0 && dy != 0 {
        dir *= FRAC_1_SQRT_2;
    }

    player.sprinting = input.sprint && moving && player.stamina >= 1.0;
    if player.sprinting {
        player.stamina = (player.stamina - config.sprint_drain * dt).max(0.0);
    } else {
        player.stamina = (player.stamina + config.stamina_regen * dt).min(player.max_stamina);
    }

    let speed = if player.sprinting {
        player.body.speed * config.sprint_multiplier
    } else {
        player.body.speed
    };
    move_body(grid, &mut player.body.pos, player.body.half_extent, dir * speed * dt);

    if let Some(facing) = input.facing.or_else(|| Facing::from_step(dx, dy)) {
        player.facing = facing;
    }

    player.attack_cooldown = player.attack_cooldown.saturating_sub(1);
    player.attack_remaining = player.attack_remaining.saturating_sub(1);

    let active = if player.attack_remaining > 0 {
        true
    } else if input.attack && player.attack_cooldown == 0 && player.stamina > 0.0 {
        player.swing_seq = player.swing_seq.wrapping_add(1);
        player.stamina = (player.stamina - weapon.stamina_cost).max(0.0);
        player.attack_cooldown = timing.cooldown_ticks;
        player.attack_remaining = timing.duration_ticks;
        true
    } else {
        false
    };

    active.then(|| {
        let (fx, fy) = player.facing.unit_vector();
        Swing {
            tag: player.swing_tag(),
            origin: player.body.pos,
            dir: Vec2::new(fx, fy),
            reach: weapon.reach,
            width: weapon.width,
            damage: weapon.damage,
            knockback: weapon.knockback,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileGrid;
    use assert_approx_eq::assert_approx_eq;
    use skirmish_protocol::{Input, PlayerId};

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (Player, TileGrid, PlayerConfig, WeaponConfig, SwingTiming) {
        let config = PlayerConfig::default();
        let weapon = WeaponConfig::default();
        let timing = SwingTiming::new(&weapon, 60);
        let player = Player::new(PlayerId(1), "p".into(), Vec2::new(320.0, 320.0), &config);
        (player, TileGrid::open(20, 20), config, weapon, timing)
    }

    fn step(p: &mut Player, g: &TileGrid, c: &PlayerConfig, w: &WeaponConfig, t: SwingTiming, input: Input) -> Option<Swing> {
        p.pending = Some(input);
        update(p, g, c, w, t, DT)
    }

    #[test]
    fn test_swing_timing_at_60hz() {
        let t = SwingTiming::new(&WeaponConfig::default(), 60);
        assert_eq!(t.cooldown_ticks, 24);
        assert_eq!(t.duration_ticks, 9);
    }

    #[test]
    fn test_update_clamps_direction() {
        let (mut p, g, c, w, t) = setup();

        step(&mut p, &g, &c, &w, t, Input { dx: 7, ..Default::default() });

        assert_approx_eq!(p.body.pos.x, 320.0 + 150.0 * DT, 1e-4);
    }

    #[test]
    fn test_update_without_input_stands_still() {
        let (mut p, g, c, w, t) = setup();

        update(&mut p, &g, &c, &w, t, DT);

        assert_eq!(p.body.pos, Vec2::new(320.0, 320.0));
    }

    #[test]
    fn test_update_sprint_doubles_speed_and_drains() {
        let (mut p, g, c, w, t) = setup();

        step(&mut p, &g, &c, &w, t, Input { dx: 1, sprint: true, ..Default::default() });

        assert!(p.sprinting);
        assert_approx_eq!(p.body.pos.x, 320.0 + 300.0 * DT, 1e-4);
        assert_approx_eq!(p.stamina, 100.0 - 35.0 * DT, 1e-4);
    }

    #[test]
    fn test_update_sprint_standing_still_regenerates() {
        let (mut p, g, c, w, t) = setup();
        p.stamina = 50.0;

        step(&mut p, &g, &c, &w, t, Input { sprint: true, ..Default::default() });

        assert!(!p.sprinting);
        assert_approx_eq!(p.stamina, 50.0 + 20.0 * DT, 1e-4);
    }

    #[test]
    fn test_update_sprint_without_stamina_walks() {
        let (mut p, g, c, w, t) = setup();
        p.stamina = 0.5;

        step(&mut p, &g, &c, &w, t, Input { dx: 1, sprint: true, ..Default::default() });

        assert!(!p.sprinting);
        assert_approx_eq!(p.body.pos.x, 320.0 + 150.0 * DT, 1e-4);
    }

    #[test]
    fn test_update_facing_follows_movement_unless_given() {
        let (mut p, g, c, w, t) = setup();

        step(&mut p, &g, &c, &w, t, Input { dx: -1, dy: -1, ..Default::default() });
        assert_eq!(p.facing, Facing::new(5).unwrap());

        step(&mut p, &g, &c, &w, t, Input { dx: 1, facing: Some(Facing::SOUTH), ..Default::default() });
        assert_eq!(p.facing, Facing::SOUTH);

        step(&mut p, &g, &c, &w, t, Input::default());
        assert_eq!(p.facing, Facing::SOUTH);
    }

    #[test]
    fn test_update_attack_stays_active_for_duration() {
        let (mut p, g, c, w, t) = setup();
        let attack = Input { attack: true, ..Default::default() };

        let first = step(&mut p, &g, &c, &w, t, attack).expect("fresh swing");
        assert_eq!(first.tag.swing_seq, 1);
        assert_approx_eq!(p.stamina, 100.0 - 15.0, 1e-3);

        let mut active = 1;
        for _ in 0..40 {
            if let Some(s) = update(&mut p, &g, &c, &w, t, DT) {
                assert_eq!(s.tag, first.tag);
                active += 1;
            }
        }
        assert_eq!(active, t.duration_ticks);
    }

    #[test]
    fn test_update_attack_respects_cooldown() {
        let (mut p, g, c, w, t) = setup();
        let attack = Input { attack: true, ..Default::default() };

        let mut seqs = Vec::new();
        for _ in 0..(t.cooldown_ticks * 2) {
            if let Some(s) = step(&mut p, &g, &c, &w, t, attack) {
                if seqs.last() != Some(&s.tag.swing_seq) {
                    seqs.push(s.tag.swing_seq);
                }
            }
        }
        // Held attack: a new swing exactly once per cooldown.
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn test_update_dead_player_does_nothing() {
        let (mut p, g, c, w, t) = setup();
        p.vitals.apply_damage(1000.0);

        let swing = step(&mut p, &g, &c, &w, t, Input { dx: 1, attack: true, ..Default::default() });

        assert!(swing.is_none());
        assert!(p.pending.is_none());
        assert_eq!(p.body.pos, Vec2::new(320.0, 320.0));
    }
}
