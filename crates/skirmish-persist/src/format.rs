//! The save file text format.

use std::fmt::Write as _;
use std::str::FromStr;

use skirmish_protocol::{decode_name, encode_name, Facing, PlayerId, ResumeToken};

use crate::PersistError;

/// First line of every save file.
pub const SAVE_MAGIC: &str = "SKIRMISH-SAVE 1";

/// Everything persisted about one world.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavedWorld {
    pub seed: u64,
    pub tick: u64,
    pub players: Vec<PlayerRecord>,
}

/// One player's persisted state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub stamina: f32,
    pub shield: f32,
    pub facing: Facing,
    pub alive: bool,
    /// Resume secret of the player's session, if it had one.
    pub token: Option<ResumeToken>,
}

impl PlayerRecord {
    /// A record with every field at its load-time fallback.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            name: format!("player-{}", id.0),
            x: 0.0,
            y: 0.0,
            hp: 100.0,
            stamina: 100.0,
            shield: 0.0,
            facing: Facing::EAST,
            alive: true,
            token: None,
        }
    }
}

/// Renders `world` in the save file format.
pub fn encode(world: &SavedWorld) -> String {
    let mut out = String::with_capacity(64 + world.players.len() * 96);
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{SAVE_MAGIC}");
    let _ = writeln!(out, "seed={}", world.seed);
    let _ = writeln!(out, "tick={}", world.tick);
    for p in &world.players {
        let _ = write!(
            out,
            "player id={} name={} x={} y={} hp={} st={} sh={} facing={} alive={}",
            p.id.0,
            encode_name(&p.name),
            p.x,
            p.y,
            p.hp,
            p.stamina,
            p.shield,
            p.facing.index(),
            u8::from(p.alive),
        );
        if let Some(token) = p.token {
            let _ = write!(out, " token={token}");
        }
        out.push('\n');
    }
    out.push_str("end\n");
    out
}

/// Parses a save file.
///
/// Only the magic line and the seed are mandatory. Any other field that is
/// missing or unreadable falls back to the value in [`PlayerRecord::new`];
/// a player line without a usable id is skipped. Unknown lines are ignored.
///
/// # Errors
/// [`PersistError::BadMagic`] or [`PersistError::MissingSeed`].
pub fn decode(text: &str) -> Result<SavedWorld, PersistError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let first = lines.next().unwrap_or_default();
    if first != SAVE_MAGIC {
        return Err(PersistError::BadMagic(first.chars().take(32).collect()));
    }

    let mut seed = None;
    let mut tick = 0;
    let mut players = Vec::new();

    for line in lines {
        if line == "end" {
            break;
        }
        if let Some(value) = line.strip_prefix("seed=") {
            seed = value.parse::<u64>().ok();
        } else if let Some(value) = line.strip_prefix("tick=") {
            tick = value.parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("player ") {
            match decode_player(rest) {
                Some(record) => players.push(record),
                None => tracing::warn!(line, "skipping player record without an id"),
            }
        }
    }

    Ok(SavedWorld {
        seed: seed.ok_or(PersistError::MissingSeed)?,
        tick,
        players,
    })
}

fn decode_player(rest: &str) -> Option<PlayerRecord> {
    let fields = || rest.split_whitespace().filter_map(|t| t.split_once('='));

    let id = fields()
        .find(|(k, _)| *k == "id")
        .and_then(|(_, v)| v.parse::<u64>().ok())
        .filter(|&id| id > 0)
        .map(PlayerId)?;

    let mut record = PlayerRecord::new(id);
    for (key, value) in fields() {
        match key {
            "name" => {
                let name = decode_name(value);
                if !name.is_empty() {
                    record.name = name;
                }
            }
            "x" => set_finite(&mut record.x, value),
            "y" => set_finite(&mut record.y, value),
            "hp" => set_finite(&mut record.hp, value),
            "st" => set_finite(&mut record.stamina, value),
            "sh" => set_finite(&mut record.shield, value),
            "facing" => {
                if let Some(f) = value.parse().ok().and_then(Facing::new) {
                    record.facing = f;
                }
            }
            "alive" => {
                if let Some(alive) = parse_flag(value) {
                    record.alive = alive;
                }
            }
            "token" => record.token = value.parse().ok(),
            _ => {}
        }
    }
    Some(record)
}

fn set_finite(slot: &mut f32, value: &str) {
    if let Ok(v) = f32::from_str(value) {
        if v.is_finite() {
            *slot = v;
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}
