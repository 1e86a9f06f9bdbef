//! Lightweight movable entities: the player, monsters, projectiles and the
//! various hazards that ride on top of the tile grid.

use std::io::{Read, Write};

use crate::bytes;
use crate::error::{FormatError, GameResult};
use crate::map::direction::{turn_preference, Direction};
use crate::map::{TileMap, TilePoint};
use crate::tile::{self, TileCategory, TileDef, TileFlags};

/// A movable entity on the grid.
///
/// Non-player actors exist as tiles on the map: the cell under them holds
/// their own kind byte, and `under` carries whatever the cell held before
/// they arrived, restored when they leave. The player floats above the
/// grid instead and never writes itself into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub pos: TilePoint,
    /// Tile id defining this actor's type.
    pub kind: u8,
    /// Current facing; `None` for actors that have stopped for good.
    pub aim: Option<Direction>,
    /// Tile id the actor is standing on top of.
    pub under: u8,
}

impl Actor {
    pub fn new(pos: TilePoint, kind: u8) -> Self {
        Self {
            pos,
            kind,
            aim: Some(Direction::Left),
            under: tile::tiles::EMPTY,
        }
    }

    pub fn def(&self) -> &'static TileDef {
        tile::def(self.kind)
    }

    pub fn is_player(&self) -> bool {
        self.def().category == TileCategory::Player
    }

    /// Whether this actor could advance one cell in `dir`.
    ///
    /// The player resolves most tile categories here (doors consult the
    /// key ring); every other actor type only passes through background,
    /// and implements its own bespoke rules in the AI dispatch on top of
    /// this primitive.
    pub fn can_move(&self, map: &TileMap, keys: &KeyRing, dir: Direction) -> bool {
        let dest = map.translate(self.pos, dir);
        if dest == self.pos {
            return false;
        }
        let dest_tile = map.at(dest);
        match tile::def(dest_tile).category {
            TileCategory::Background => true,
            _ if !self.is_player() => false,
            TileCategory::Swamp
            | TileCategory::Pickup
            | TileCategory::Diamond
            | TileCategory::Stop
            | TileCategory::Key => true,
            TileCategory::Door => keys.contains(tile::matching_key(dest_tile)),
            _ => false,
        }
    }

    /// Advances one cell, swapping the carried under-tile: the origin cell
    /// gets the old under-tile back, and whatever the destination held
    /// becomes the new under-tile. Callers must have validated the move.
    pub fn step(&mut self, map: &mut TileMap, dir: Direction) {
        let dest = map.translate(self.pos, dir);
        debug_assert_ne!(dest, self.pos, "step into the board edge");
        let carried = map.at(self.pos);
        map.set(self.pos, self.under);
        self.under = map.at(dest);
        map.set(dest, carried);
        self.pos = dest;
    }

    /// The wall-hugging patrol scan: tries the four directions in the
    /// preference order for the current facing and returns the first one
    /// that works, or `None` when boxed in. Tiles flagged `REVERSE` scan
    /// the table in the opposite order and hug the other wall.
    pub fn next_open_direction(&self, map: &TileMap, keys: &KeyRing) -> Option<Direction> {
        let facing = self.aim.unwrap_or_default();
        let prefs = turn_preference(facing);
        let reversed = self.def().flags.contains(TileFlags::REVERSE);
        let mut scan = |dir: Direction| self.can_move(map, keys, dir).then_some(dir);
        if reversed {
            prefs.iter().copied().find_map(&mut scan)
        } else {
            prefs.iter().rev().copied().find_map(&mut scan)
        }
    }

    /// Serial layout: x, y, kind, aim, under-tile — five bytes, fixed order.
    pub fn write<W: Write>(&self, w: &mut W) -> GameResult<()> {
        bytes::check_bound("actor.x", self.pos.x as u32, 256)?;
        bytes::check_bound("actor.y", self.pos.y as u32, 256)?;
        bytes::write_u8(w, self.pos.x as u8).map_err(FormatError::Io)?;
        bytes::write_u8(w, self.pos.y as u8).map_err(FormatError::Io)?;
        bytes::write_u8(w, self.kind).map_err(FormatError::Io)?;
        bytes::write_u8(w, Direction::encode_aim(self.aim)).map_err(FormatError::Io)?;
        bytes::write_u8(w, self.under).map_err(FormatError::Io)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> GameResult<Self> {
        let x = bytes::read_u8(r).map_err(FormatError::Io)?;
        let y = bytes::read_u8(r).map_err(FormatError::Io)?;
        let kind = bytes::read_u8(r).map_err(FormatError::Io)?;
        let aim = Direction::decode_aim(bytes::read_u8(r).map_err(FormatError::Io)?)?;
        let under = bytes::read_u8(r).map_err(FormatError::Io)?;
        Ok(Self {
            pos: TilePoint::new(x as i16, y as i16),
            kind,
            aim,
            under,
        })
    }
}

/// The held-keys set: a fixed-size slot array with first-empty-slot
/// insertion. Insertion is idempotent and slot order is stable, which the
/// save format depends on. Slot value 0 means empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyRing {
    slots: [u8; crate::constants::MAX_KEYS],
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: u8) -> bool {
        key != 0 && self.slots.contains(&key)
    }

    /// Adds a key to the first empty slot. A key already present is not
    /// re-added; returns whether the key is held afterwards.
    pub fn insert(&mut self, key: u8) -> bool {
        if key == 0 {
            return false;
        }
        if self.contains(key) {
            return true;
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| **s == 0) {
            *slot = key;
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.slots = [0; crate::constants::MAX_KEYS];
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots.iter().copied().filter(|&k| k != 0)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw slot bytes, in slot order.
    pub fn write<W: Write>(&self, w: &mut W) -> GameResult<()> {
        w.write_all(&self.slots).map_err(FormatError::Io)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> GameResult<Self> {
        let mut slots = [0u8; crate::constants::MAX_KEYS];
        r.read_exact(&mut slots).map_err(FormatError::Io)?;
        Ok(Self { slots })
    }
}
