//! Text codecs for input lines, snapshots and the map block.
//!
//! Writers take any [`fmt::Write`] sink (a `String` in practice) and
//! readers take any iterator of lines, so the same code serves the socket
//! path, tests, and offline tools.
//!
//! Two failure styles coexist on purpose:
//!
//! - single `INPUT` lines are parsed field by field, and a broken field
//!   falls back to its default instead of discarding the line;
//! - multi-line blocks (`SNAPSHOT`, `MAP`) are all-or-nothing, since a
//!   half-read block would desynchronize the framing.

use std::fmt;

use crate::name::{decode_name, encode_name};
use crate::types::{
    ClientMessage, EnemyId, EnemySnapshot, Facing, Input, MapBlock, PlayerId,
    PlayerSnapshot, Snapshot,
};
use crate::ProtocolError;

/// Largest map a `MAP` header may announce, in tiles.
pub const MAX_MAP_TILES: i64 = 1 << 24;

/// Cap on up-front reservations sized from a header count.
const MAX_RESERVE: usize = 256;

/// Splits the space-separated `key=value` tokens of a line. Tokens
/// without `=` are skipped.
pub(crate) fn fields(rest: &str) -> impl Iterator<Item = (&str, &str)> {
    rest.split_ascii_whitespace()
        .filter_map(|token| token.split_once('='))
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true")
}

// ---------------------------------------------------------------------------
// Client lines
// ---------------------------------------------------------------------------

/// Parses an `INPUT` line.
///
/// Returns `None` if the line is not an `INPUT` line at all. Unknown keys
/// are ignored and unparsable values fall back to the field's default, so
/// one corrupt field never costs the whole line.
pub fn parse_input(line: &str) -> Option<Input> {
    let (keyword, rest) = split_keyword(line);
    if keyword != "INPUT" {
        return None;
    }

    let mut input = Input::default();
    for (key, value) in fields(rest) {
        match key {
            "t" => input.tick = value.parse().unwrap_or(0),
            "dx" => input.dx = value.parse().unwrap_or(0),
            "dy" => input.dy = value.parse().unwrap_or(0),
            "sprint" => input.sprint = parse_flag(value),
            "attack" => input.attack = parse_flag(value),
            "facing" => input.facing = value.parse().ok().and_then(Facing::new),
            _ => {}
        }
    }
    Some(input)
}

/// Parses any client line. Returns `None` for unrecognized lines.
pub fn parse_client_line(line: &str) -> Option<ClientMessage> {
    let (keyword, rest) = split_keyword(line);
    match keyword {
        "INPUT" => parse_input(line).map(ClientMessage::Input),
        "JOIN" => Some(ClientMessage::parse_join(rest)),
        _ => None,
    }
}

fn split_keyword(line: &str) -> (&str, &str) {
    let line = line.trim();
    line.split_once(char::is_whitespace).unwrap_or((line, ""))
}

// ---------------------------------------------------------------------------
// Snapshot block
// ---------------------------------------------------------------------------

/// Writes a `SNAPSHOT` block, terminated by `END`.
pub fn write_snapshot<W: fmt::Write>(snapshot: &Snapshot, out: &mut W) -> fmt::Result {
    writeln!(
        out,
        "SNAPSHOT tick={} players={}",
        snapshot.tick,
        snapshot.players.len()
    )?;
    for p in &snapshot.players {
        writeln!(
            out,
            "P id={} x={:.3} y={:.3} hp={:.3} st={:.3} sh={:.3} facing={} alive={} name={}",
            p.id.0,
            p.x,
            p.y,
            p.hp,
            p.stamina,
            p.shield,
            p.facing.index(),
            u8::from(p.alive),
            encode_name(&p.name),
        )?;
    }
    for e in &snapshot.enemies {
        writeln!(
            out,
            "E id={} x={:.3} y={:.3} hp={:.3} alive={}",
            e.id.0,
            e.x,
            e.y,
            e.hp,
            u8::from(e.alive),
        )?;
    }
    writeln!(out, "END")
}

/// Convenience wrapper that renders a snapshot into a fresh `String`.
pub fn encode_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::with_capacity(64 + 96 * (snapshot.players.len() + snapshot.enemies.len()));
    // Writing into a String cannot fail.
    let _ = write_snapshot(snapshot, &mut out);
    out
}

/// Reads one `SNAPSHOT` block from `lines`.
///
/// Returns `Ok(None)` if `lines` is exhausted before a header arrives (no
/// message yet). Blank lines before the header are skipped.
///
/// # Errors
/// - [`ProtocolError::InvalidHeader`] if `tick` or `players` is missing or
///   unparsable.
/// - [`ProtocolError::UnexpectedEof`] if the source ends before `END`.
/// - [`ProtocolError::UnexpectedLine`] for anything out of place.
pub fn read_snapshot<I, S>(lines: &mut I) -> Result<Option<Snapshot>, ProtocolError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    const BLOCK: &str = "SNAPSHOT";

    let Some(header) = next_non_blank(lines) else {
        return Ok(None);
    };
    let (keyword, rest) = split_keyword(&header);
    if keyword != BLOCK {
        return Err(ProtocolError::UnexpectedLine {
            block: BLOCK,
            line: header,
        });
    }

    let mut tick = None;
    let mut player_count = None;
    for (key, value) in fields(rest) {
        match key {
            "tick" => tick = value.parse::<u64>().ok(),
            "players" => player_count = value.parse::<usize>().ok(),
            _ => {}
        }
    }
    let (Some(tick), Some(player_count)) = (tick, player_count) else {
        return Err(ProtocolError::InvalidHeader {
            block: BLOCK,
            line: header,
        });
    };

    let mut snapshot = Snapshot {
        tick,
        players: Vec::with_capacity(player_count.min(MAX_RESERVE)),
        enemies: Vec::new(),
    };

    for _ in 0..player_count {
        let line = lines
            .next()
            .ok_or(ProtocolError::UnexpectedEof(BLOCK))?;
        let (keyword, rest) = split_keyword(line.as_ref());
        if keyword != "P" {
            return Err(ProtocolError::UnexpectedLine {
                block: BLOCK,
                line: line.as_ref().to_string(),
            });
        }
        snapshot.players.push(parse_player(rest));
    }

    loop {
        let line = lines
            .next()
            .ok_or(ProtocolError::UnexpectedEof(BLOCK))?;
        let (keyword, rest) = split_keyword(line.as_ref());
        match keyword {
            "END" => return Ok(Some(snapshot)),
            "E" => snapshot.enemies.push(parse_enemy(rest)),
            _ => {
                return Err(ProtocolError::UnexpectedLine {
                    block: BLOCK,
                    line: line.as_ref().to_string(),
                });
            }
        }
    }
}

fn parse_player(rest: &str) -> PlayerSnapshot {
    let mut p = PlayerSnapshot {
        id: PlayerId(0),
        x: 0.0,
        y: 0.0,
        hp: 0.0,
        stamina: 0.0,
        shield: 0.0,
        facing: Facing::default(),
        alive: false,
        name: String::new(),
    };
    for (key, value) in fields(rest) {
        match key {
            "id" => p.id = PlayerId(value.parse().unwrap_or(0)),
            "x" => p.x = value.parse().unwrap_or(0.0),
            "y" => p.y = value.parse().unwrap_or(0.0),
            "hp" => p.hp = value.parse().unwrap_or(0.0),
            "st" => p.stamina = value.parse().unwrap_or(0.0),
            "sh" => p.shield = value.parse().unwrap_or(0.0),
            "facing" => {
                p.facing = value.parse().ok().and_then(Facing::new).unwrap_or_default()
            }
            "alive" => p.alive = parse_flag(value),
            "name" => p.name = decode_name(value),
            _ => {}
        }
    }
    p
}

fn parse_enemy(rest: &str) -> EnemySnapshot {
    let mut e = EnemySnapshot {
        id: EnemyId(0),
        x: 0.0,
        y: 0.0,
        hp: 0.0,
        alive: false,
    };
    for (key, value) in fields(rest) {
        match key {
            "id" => e.id = EnemyId(value.parse().unwrap_or(0)),
            "x" => e.x = value.parse().unwrap_or(0.0),
            "y" => e.y = value.parse().unwrap_or(0.0),
            "hp" => e.hp = value.parse().unwrap_or(0.0),
            "alive" => e.alive = parse_flag(value),
            _ => {}
        }
    }
    e
}

// ---------------------------------------------------------------------------
// Map block
// ---------------------------------------------------------------------------

/// Writes a `MAP` block: header, `height` rows of `width` tiles
/// (`#` wall, `.` floor), then `ENDMAP`.
pub fn write_map<W, F>(width: u32, height: u32, is_wall: F, out: &mut W) -> fmt::Result
where
    W: fmt::Write,
    F: Fn(u32, u32) -> bool,
{
    writeln!(out, "MAP w={width} h={height}")?;
    for y in 0..height {
        for x in 0..width {
            out.write_char(if is_wall(x, y) { '#' } else { '.' })?;
        }
        out.write_char('\n')?;
    }
    writeln!(out, "ENDMAP")
}

/// Reads one `MAP` block from `lines`.
///
/// Returns `Ok(None)` if `lines` is exhausted before a header arrives.
/// Any tile character other than `#` is floor.
///
/// # Errors
/// - [`ProtocolError::InvalidHeader`] for missing or non-positive dimensions,
///   or more than [`MAX_MAP_TILES`] tiles.
/// - [`ProtocolError::BadRow`] for a row whose length differs from `w`.
/// - [`ProtocolError::UnexpectedEof`] if the source ends inside the block.
/// - [`ProtocolError::UnexpectedLine`] if `ENDMAP` is not where it belongs.
pub fn read_map<I, S>(lines: &mut I) -> Result<Option<MapBlock>, ProtocolError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    const BLOCK: &str = "MAP";

    let Some(header) = next_non_blank(lines) else {
        return Ok(None);
    };
    let (keyword, rest) = split_keyword(&header);
    if keyword != BLOCK {
        return Err(ProtocolError::UnexpectedLine {
            block: BLOCK,
            line: header,
        });
    }

    let mut width = 0i64;
    let mut height = 0i64;
    for (key, value) in fields(rest) {
        match key {
            "w" => width = value.parse().unwrap_or(0),
            "h" => height = value.parse().unwrap_or(0),
            _ => {}
        }
    }
    let tiles = width.checked_mul(height).unwrap_or(i64::MAX);
    if width <= 0 || height <= 0 || tiles > MAX_MAP_TILES {
        return Err(ProtocolError::InvalidHeader {
            block: BLOCK,
            line: header,
        });
    }
    let (width, height) = (width as u32, height as u32);

    let mut walls = Vec::with_capacity(width as usize);
    for row in 0..height {
        let line = lines.next().ok_or(ProtocolError::UnexpectedEof(BLOCK))?;
        let row_text = line.as_ref().trim_end_matches('\r');
        let found = row_text.chars().count();
        if found != width as usize {
            return Err(ProtocolError::BadRow {
                row,
                expected: width,
                found,
            });
        }
        walls.extend(row_text.chars().map(|c| c == '#'));
    }

    let end = lines.next().ok_or(ProtocolError::UnexpectedEof(BLOCK))?;
    if end.as_ref().trim() != "ENDMAP" {
        return Err(ProtocolError::UnexpectedLine {
            block: BLOCK,
            line: end.as_ref().to_string(),
        });
    }

    Ok(Some(MapBlock {
        width,
        height,
        walls,
    }))
}

fn next_non_blank<I, S>(lines: &mut I) -> Option<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .find(|line| !line.as_ref().trim().is_empty())
        .map(|line| line.as_ref().to_string())
}
