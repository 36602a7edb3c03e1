//! Core protocol types for Skirmish's wire format.
//!
//! Every type in this module is something that travels "on the wire" as a
//! line of ASCII text. The textual forms live next to the types (via
//! `Display` for single-line messages) or in [`crate::codec`] for the
//! multi-line blocks.

use std::f32::consts::FRAC_1_SQRT_2;
use std::fmt;

use crate::name::{decode_name, encode_name, sanitize_name};

/// Version announced in the `HELLO` line.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Allocated by the server starting at 1 and never reused within a session,
/// so `PlayerId(0)` never names a real player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Sequential identifier of an enemy within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnemyId(pub u32);

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

/// Secret handed to a client in `YOU` and required in `JOIN` to take a
/// disconnected player back. Sixteen hex digits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResumeToken(pub u64);

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for ResumeToken {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

/// One of the eight compass octants, encoded 0–7 on the wire.
///
/// Octant 0 points along +x and the index grows clockwise on screen
/// (+y points down): 0 = east, 2 = south, 4 = west, 6 = north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Facing(u8);

impl Facing {
    pub const EAST: Facing = Facing(0);
    pub const SOUTH: Facing = Facing(2);
    pub const WEST: Facing = Facing(4);
    pub const NORTH: Facing = Facing(6);

    /// Returns the facing for octant `index`, or `None` outside 0–7.
    pub fn new(index: i64) -> Option<Self> {
        (0..8).contains(&index).then_some(Self(index as u8))
    }

    /// The wire value, 0–7.
    pub fn index(self) -> u8 {
        self.0
    }

    /// The octant of an integer step direction, `None` for a zero step.
    pub fn from_step(dx: i32, dy: i32) -> Option<Self> {
        let index = match (dx.signum(), dy.signum()) {
            (1, 0) => 0,
            (1, 1) => 1,
            (0, 1) => 2,
            (-1, 1) => 3,
            (-1, 0) => 4,
            (-1, -1) => 5,
            (0, -1) => 6,
            (1, -1) => 7,
            _ => return None,
        };
        Some(Self(index))
    }

    /// Unit vector pointing along this octant.
    pub fn unit_vector(self) -> (f32, f32) {
        let d = FRAC_1_SQRT_2;
        match self.0 {
            0 => (1.0, 0.0),
            1 => (d, d),
            2 => (0.0, 1.0),
            3 => (-d, d),
            4 => (-1.0, 0.0),
            5 => (-d, -d),
            6 => (0.0, -1.0),
            _ => (d, -d),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// One tick's worth of player intent, as carried by an `INPUT` line.
///
/// Values are kept as the client sent them (after per-field fallback);
/// the simulation is responsible for clamping the direction components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Input {
    /// The client's notion of the tick this input belongs to.
    pub tick: u64,
    pub dx: i32,
    pub dy: i32,
    pub sprint: bool,
    pub attack: bool,
    /// `None` means "keep facing" (`facing=-1` on the wire).
    pub facing: Option<Facing>,
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "INPUT t={} dx={} dy={} sprint={} attack={} facing={}",
            self.tick,
            self.dx,
            self.dy,
            u8::from(self.sprint),
            u8::from(self.attack),
            self.facing.map_or(-1, |f| i32::from(f.index())),
        )
    }
}

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Optional first line: display name and, when reconnecting, the id
    /// and token the client was given in `YOU`.
    Join {
        name: Option<String>,
        resume: Option<PlayerId>,
        token: Option<ResumeToken>,
    },
    /// Per-tick intent.
    Input(Input),
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join {
                name,
                resume,
                token,
            } => {
                write!(f, "JOIN")?;
                if let Some(name) = name {
                    write!(f, " name={}", encode_name(name))?;
                }
                if let Some(id) = resume {
                    write!(f, " id={}", id.0)?;
                }
                if let Some(token) = token {
                    write!(f, " token={token}")?;
                }
                Ok(())
            }
            Self::Input(input) => input.fmt(f),
        }
    }
}

impl ClientMessage {
    /// Parses a `JOIN` line. Names are decoded and sanitized; a name that
    /// sanitizes to nothing is treated as absent.
    pub(crate) fn parse_join(rest: &str) -> Self {
        let mut name = None;
        let mut resume = None;
        let mut token = None;
        for (key, value) in crate::codec::fields(rest) {
            match key {
                "name" => name = sanitize_name(&decode_name(value)),
                "id" => {
                    resume = value.parse::<u64>().ok().filter(|&id| id > 0).map(PlayerId)
                }
                "token" => token = value.parse().ok(),
                _ => {}
            }
        }
        Self::Join {
            name,
            resume,
            token,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client: single-line messages
// ---------------------------------------------------------------------------

/// The single-line messages of the join handshake.
///
/// The `MAP` block sits between `TickRate` and `You` in the handshake and is
/// written by [`crate::write_map`], not by this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello { protocol: u32 },
    Seed(u64),
    TickRate(u32),
    /// The client's player id, with the token that resumes it later.
    You {
        id: PlayerId,
        token: Option<ResumeToken>,
    },
    Ready,
    Welcome { name: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello { protocol } => write!(f, "HELLO proto={protocol}"),
            // Seeds are signed 64-bit on the wire.
            Self::Seed(seed) => write!(f, "SEED {}", *seed as i64),
            Self::TickRate(rate) => write!(f, "TICKRATE {rate}"),
            Self::You { id, token } => {
                write!(f, "YOU id={}", id.0)?;
                if let Some(token) = token {
                    write!(f, " token={token}")?;
                }
                Ok(())
            }
            Self::Ready => write!(f, "READY"),
            Self::Welcome { name } => write!(f, "WELCOME {}", encode_name(name)),
        }
    }
}

impl ServerMessage {
    /// Parses one handshake line. Returns `None` for anything else.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        match keyword {
            "HELLO" => crate::codec::fields(rest)
                .find(|(k, _)| *k == "proto")
                .and_then(|(_, v)| v.parse().ok())
                .map(|protocol| Self::Hello { protocol }),
            "SEED" => rest.trim().parse::<i64>().ok().map(|s| Self::Seed(s as u64)),
            "TICKRATE" => rest.trim().parse().ok().map(Self::TickRate),
            "YOU" => {
                let mut id = None;
                let mut token = None;
                for (key, value) in crate::codec::fields(rest) {
                    match key {
                        "id" => id = value.parse().ok().map(PlayerId),
                        "token" => token = value.parse().ok(),
                        _ => {}
                    }
                }
                id.map(|id| Self::You { id, token })
            }
            "READY" => Some(Self::Ready),
            "WELCOME" => Some(Self::Welcome {
                name: decode_name(rest.trim()),
            }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client: blocks
// ---------------------------------------------------------------------------

/// Public state of one player inside a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub stamina: f32,
    pub shield: f32,
    pub facing: Facing,
    pub alive: bool,
    pub name: String,
}

/// Public state of one enemy inside a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemySnapshot {
    pub id: EnemyId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub alive: bool,
}

/// Point-in-time world state, broadcast at a fixed rate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
}

/// The static collision grid as transferred in the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapBlock {
    pub width: u32,
    pub height: u32,
    /// Row-major wall flags, `width * height` entries.
    pub walls: Vec<bool>,
}

impl MapBlock {
    /// Whether tile `(x, y)` is a wall. Out-of-range tiles count as walls.
    pub fn is_wall(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return true;
        }
        self.walls[(y * self.width + x) as usize]
    }
}
