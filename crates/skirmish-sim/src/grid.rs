//! The collision grid: which tiles are walls.
//!
//! The simulation only needs the [`CollisionGrid`] capability. [`TileGrid`]
//! is the implementation the server ships with: a plain wall bitmap that
//! can be generated from a seed or loaded from a transferred map block.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use skirmish_protocol::MapBlock;

/// Edge length of one tile in world units.
pub const TILE_SIZE: f32 = 32.0;

/// Random attempts before falling back to a full scan.
const SAMPLE_ATTEMPTS: usize = 256;

/// Read-only wall lookup shared by every system that moves things.
///
/// Out-of-range tiles are walls, so nothing can leave the map.
pub trait CollisionGrid: Send + Sync {
    /// Width in tiles.
    fn width(&self) -> u32;

    /// Height in tiles.
    fn height(&self) -> u32;

    fn is_wall_tile(&self, tx: i32, ty: i32) -> bool;

    /// Whether an axis-aligned box centred on `center` overlaps a wall tile
    /// or leaves the world bounds. Touching a tile edge is not overlap.
    fn collides_box(&self, center: Vec2, half_extent: f32) -> bool {
        let min = center - Vec2::splat(half_extent);
        let max = center + Vec2::splat(half_extent);
        let world_w = self.width() as f32 * TILE_SIZE;
        let world_h = self.height() as f32 * TILE_SIZE;
        if min.x < 0.0 || min.y < 0.0 || max.x > world_w || max.y > world_h {
            return true;
        }

        let tx0 = (min.x / TILE_SIZE).floor() as i32;
        let ty0 = (min.y / TILE_SIZE).floor() as i32;
        let tx1 = (max.x / TILE_SIZE).ceil() as i32 - 1;
        let ty1 = (max.y / TILE_SIZE).ceil() as i32 - 1;
        (ty0..=ty1).any(|ty| (tx0..=tx1).any(|tx| self.is_wall_tile(tx, ty)))
    }

    /// Picks a random floor tile whose centre is at least `min_distance`
    /// world units from `origin`.
    ///
    /// Falls back to the farthest floor tile when no tile is far enough,
    /// and returns `None` only when the grid has no floor at all.
    fn random_floor_tile_far_from(
        &self,
        origin: Vec2,
        min_distance: f32,
        rng: &mut dyn RngCore,
    ) -> Option<(i32, i32)> {
        let (w, h) = (self.width() as i32, self.height() as i32);
        if w == 0 || h == 0 {
            return None;
        }
        let min_sq = min_distance * min_distance;

        for _ in 0..SAMPLE_ATTEMPTS {
            let tx = rng.random_range(0..w);
            let ty = rng.random_range(0..h);
            if !self.is_wall_tile(tx, ty) && tile_center(tx, ty).distance_squared(origin) >= min_sq
            {
                return Some((tx, ty));
            }
        }

        // Sparse floor: scan every tile, preferring the farthest.
        let mut best: Option<((i32, i32), f32)> = None;
        for ty in 0..h {
            for tx in 0..w {
                if self.is_wall_tile(tx, ty) {
                    continue;
                }
                let d = tile_center(tx, ty).distance_squared(origin);
                if best.is_none_or(|(_, bd)| d > bd) {
                    best = Some(((tx, ty), d));
                }
            }
        }
        best.map(|(tile, _)| tile)
    }

    /// World-space centre of the map.
    fn center(&self) -> Vec2 {
        Vec2::new(
            self.width() as f32 * TILE_SIZE / 2.0,
            self.height() as f32 * TILE_SIZE / 2.0,
        )
    }
}

/// World-space centre of tile `(tx, ty)`.
pub fn tile_center(tx: i32, ty: i32) -> Vec2 {
    Vec2::new(
        (tx as f32 + 0.5) * TILE_SIZE,
        (ty as f32 + 0.5) * TILE_SIZE,
    )
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

/// A wall bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    walls: Vec<bool>,
}

impl TileGrid {
    /// An empty room: floor everywhere except a one-tile border wall.
    pub fn open(width: u32, height: u32) -> Self {
        let mut walls = vec![false; (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    walls[(y * width + x) as usize] = true;
                }
            }
        }
        Self {
            width,
            height,
            walls,
        }
    }

    /// Builds a grid from `#`/`.` rows. The width is the longest row;
    /// shorter rows are padded with wall.
    pub fn from_rows(rows: &[&str]) -> Self {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let height = rows.len() as u32;
        let mut walls = vec![true; (width * height) as usize];
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                walls[y * width as usize + x] = c == '#';
            }
        }
        Self {
            width,
            height,
            walls,
        }
    }

    /// Adopts a map block received over the wire.
    pub fn from_map(map: &MapBlock) -> Self {
        Self {
            width: map.width,
            height: map.height,
            walls: map.walls.clone(),
        }
    }

    /// Generates a walled arena with scattered rectangular obstacles.
    ///
    /// The same `seed` always produces the same grid. A radius of four tiles
    /// around the centre is kept clear.
    pub fn generate(seed: u64, width: u32, height: u32) -> Self {
        let width = width.max(8);
        let height = height.max(8);
        let mut grid = Self::open(width, height);
        let mut rng = StdRng::seed_from_u64(seed ^ 0x6D61_705F_6765_6E31);

        let (cx, cy) = (width as i32 / 2, height as i32 / 2);
        let obstacles = (width * height / 60).max(1);
        for _ in 0..obstacles {
            let w = rng.random_range(1..=4);
            let h = rng.random_range(1..=4);
            let x0 = rng.random_range(1..width as i32 - 1);
            let y0 = rng.random_range(1..height as i32 - 1);
            for y in y0..(y0 + h).min(height as i32 - 1) {
                for x in x0..(x0 + w).min(width as i32 - 1) {
                    if (x - cx).abs() <= 4 && (y - cy).abs() <= 4 {
                        continue;
                    }
                    grid.walls[(y as u32 * width + x as u32) as usize] = true;
                }
            }
        }
        grid
    }

    /// Number of floor tiles.
    pub fn floor_count(&self) -> usize {
        self.walls.iter().filter(|w| !**w).count()
    }
}

impl CollisionGrid for TileGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_wall_tile(&self, tx: i32, ty: i32) -> bool {
        if tx < 0 || ty < 0 || tx as u32 >= self.width || ty as u32 >= self.height {
            return true;
        }
        self.walls[(ty as u32 * self.width + tx as u32) as usize]
    }
}
