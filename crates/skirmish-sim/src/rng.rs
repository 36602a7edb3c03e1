//! Per-enemy linear-congruential generator.
//!
//! Each enemy carries its own generator so that wandering depends only on
//! the enemy's spawn tile and how many times it has picked a direction,
//! never on other enemies or on a shared stream.

/// 32-bit LCG: `state = state * 1664525 + 1013904223 (mod 2^32)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub const MULTIPLIER: u32 = 1_664_525;
    pub const INCREMENT: u32 = 1_013_904_223;

    /// Constant mixed into every spawn-derived seed.
    pub const SPAWN_SALT: u32 = 0x2545_F491;

    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seeds a generator from the tile an enemy spawned on.
    pub fn from_spawn(tx: i32, ty: i32) -> Self {
        let hash = (tx as u32).wrapping_mul(73_856_093) ^ (ty as u32).wrapping_mul(19_349_663);
        Self::new(hash ^ Self::SPAWN_SALT)
    }

    /// Advances the generator and returns the new state.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }

    /// Uniform float in `[0, 1)`, from the high 24 bits.
    pub fn next_unit(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform integer in `min..=max`.
    pub fn next_hold(&mut self, min: u32, max: u32) -> u32 {
        let span = max.saturating_sub(min).saturating_add(1);
        min + self.next_u32() % span
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_u32_follows_recurrence() {
        let mut lcg = Lcg::new(0);
        assert_eq!(lcg.next_u32(), 1_013_904_223);
        assert_eq!(lcg.next_u32(), 1_196_435_762);
    }

    #[test]
    fn test_next_u32_wraps_around() {
        let mut lcg = Lcg::new(u32::MAX);
        let expected = u32::MAX
            .wrapping_mul(Lcg::MULTIPLIER)
            .wrapping_add(Lcg::INCREMENT);
        assert_eq!(lcg.next_u32(), expected);
    }

    #[test]
    fn test_next_unit_in_range() {
        let mut lcg = Lcg::new(12345);
        for _ in 0..10_000 {
            let v = lcg.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_next_hold_in_range() {
        let mut lcg = Lcg::new(7);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..10_000 {
            let h = lcg.next_hold(15, 35);
            assert!((15..=35).contains(&h));
            seen_min |= h == 15;
            seen_max |= h == 35;
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn test_from_spawn_differs_per_tile() {
        assert_eq!(Lcg::from_spawn(3, 4), Lcg::from_spawn(3, 4));
        assert_ne!(Lcg::from_spawn(3, 4), Lcg::from_spawn(4, 3));
    }
}
