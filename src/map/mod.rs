//! The level grid: tile bytes, the attribute overlay, decorative layers,
//! and the per-map state registry.

pub mod archive;
pub mod direction;

use std::collections::BTreeMap;
use std::io::{Read, Write};

use glam::I16Vec2;
use strum_macros::FromRepr;
use tracing::warn;

use crate::bytes;
use crate::constants::{MAP_MAGIC, MAX_BOARD};
use crate::error::{FormatError, GameError, GameResult, MapError};
use direction::Direction;

/// A grid coordinate. Bosses use the same type at double resolution.
pub type TilePoint = I16Vec2;

/// Role of a decorative overlay layer. The simulation core carries these
/// through load/save untouched; only the renderer interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum LayerKind {
    Background,
    Foreground,
    Solid,
    Deadly,
    Water,
}

/// One same-size overlay grid tagged with its rendering role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLayer {
    pub kind: LayerKind,
    pub tiles: Vec<u8>,
}

/// A value in the per-map state registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Number(u16),
    Text(String),
}

const STATE_TAG_NUMBER: u8 = 0;
const STATE_TAG_TEXT: u8 = 1;

/// Well-known state registry keys.
pub mod state_keys {
    /// Level countdown duration, in ticks.
    pub const TIMEOUT: u16 = 1;
    /// Par time for the level, in ticks.
    pub const PAR_TIME: u16 = 2;
    /// Nonzero marks the level as a secret level.
    pub const SECRET: u16 = 3;
    /// Nonzero hides the level from the public level list.
    pub const PRIVATE: u16 = 4;
    /// Localized hint text shown on entry.
    pub const HINT: u16 = 5;
}

/// The playfield grid plus its attribute plane.
///
/// Attribute value 0 means "no trigger group"; cells sharing a nonzero
/// attribute clear together when any one of them is collected.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    width: u16,
    height: u16,
    tiles: Vec<u8>,
    attrs: Vec<u8>,
    pub title: String,
    layers: Vec<MapLayer>,
    states: BTreeMap<u16, StateValue>,
}

impl TileMap {
    /// A blank map filled with the given tile, all attributes zero.
    pub fn new(width: u16, height: u16, fill: u8) -> GameResult<Self> {
        if width == 0 || height == 0 || width > MAX_BOARD || height > MAX_BOARD {
            return Err(MapError::InvalidDimensions { width, height }.into());
        }
        let cells = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            tiles: vec![fill; cells],
            attrs: vec![0; cells],
            title: String::new(),
            layers: Vec::new(),
            states: BTreeMap::new(),
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Board size as a point, for bounds math.
    pub fn size(&self) -> TilePoint {
        TilePoint::new(self.width as i16, self.height as i16)
    }

    pub fn contains(&self, p: TilePoint) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u16) < self.width && (p.y as u16) < self.height
    }

    fn index(&self, p: TilePoint) -> usize {
        debug_assert!(self.contains(p), "cell {p} outside {}x{} grid", self.width, self.height);
        p.y as usize * self.width as usize + p.x as usize
    }

    /// Tile id at a cell. The hot path pre-validates via [`TileMap::translate`];
    /// out-of-bounds access panics like any slice index.
    pub fn at(&self, p: TilePoint) -> u8 {
        self.tiles[self.index(p)]
    }

    pub fn set(&mut self, p: TilePoint, tile: u8) {
        let i = self.index(p);
        self.tiles[i] = tile;
    }

    /// Attribute byte at a cell, same indexing as [`TileMap::at`].
    pub fn attr(&self, p: TilePoint) -> u8 {
        self.attrs[self.index(p)]
    }

    pub fn set_attr(&mut self, p: TilePoint, attr: u8) {
        let i = self.index(p);
        self.attrs[i] = attr;
    }

    /// Bounds-checked accessor for callers outside the tick path.
    pub fn get(&self, p: TilePoint) -> GameResult<u8> {
        if !self.contains(p) {
            return Err(MapError::OutOfBounds {
                x: p.x,
                y: p.y,
                width: self.width,
                height: self.height,
            }
            .into());
        }
        Ok(self.at(p))
    }

    /// Displaces a point one cell in a direction, clamped at the board
    /// edge: at the boundary the position simply does not change.
    pub fn translate(&self, p: TilePoint, dir: Direction) -> TilePoint {
        let next = p + dir.offset();
        if self.contains(next) {
            next
        } else {
            p
        }
    }

    /// First cell (row-major) holding the given tile id.
    pub fn find_first(&self, tile: u8) -> Option<TilePoint> {
        self.tiles.iter().position(|&t| t == tile).map(|i| {
            TilePoint::new(
                (i % self.width as usize) as i16,
                (i / self.width as usize) as i16,
            )
        })
    }

    /// Number of cells holding the given tile id.
    pub fn count(&self, tile: u8) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }

    /// Iterates all cell positions, row-major.
    pub fn cells(&self) -> impl Iterator<Item = TilePoint> + '_ {
        let width = self.width as usize;
        (0..self.tiles.len()).map(move |i| TilePoint::new((i % width) as i16, (i / width) as i16))
    }

    /// Reallocates the grids. Content outside the new bounds is discarded;
    /// new cells get `fill`. Overlay layers are resized the same way with
    /// zero fill.
    pub fn resize(&mut self, width: u16, height: u16, fill: u8, clear_attrs: bool) -> GameResult<()> {
        if width == 0 || height == 0 || width > MAX_BOARD || height > MAX_BOARD {
            return Err(MapError::InvalidDimensions { width, height }.into());
        }
        self.tiles = regrid(&self.tiles, self.width, self.height, width, height, fill);
        self.attrs = if clear_attrs {
            vec![0; width as usize * height as usize]
        } else {
            regrid(&self.attrs, self.width, self.height, width, height, 0)
        };
        for layer in &mut self.layers {
            layer.tiles = regrid(&layer.tiles, self.width, self.height, width, height, 0);
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Rotates the whole grid one cell in a direction with wraparound.
    /// A cell that wraps to the opposite edge carries its attribute with it.
    pub fn shift(&mut self, dir: Direction) {
        shift_grid(&mut self.tiles, self.width as usize, dir);
        shift_grid(&mut self.attrs, self.width as usize, dir);
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    /// Adds an overlay layer; the grid must match the map dimensions.
    pub fn push_layer(&mut self, kind: LayerKind, grid: Vec<u8>) -> GameResult<()> {
        if grid.len() != self.tiles.len() {
            warn!(got = grid.len(), want = self.tiles.len(), "rejecting overlay layer with mismatched size");
            return Err(GameError::InvalidState(format!(
                "overlay layer has {} cells, map has {}",
                grid.len(),
                self.tiles.len()
            )));
        }
        self.layers.push(MapLayer { kind, tiles: grid });
        Ok(())
    }

    pub fn state(&self, key: u16) -> Option<&StateValue> {
        self.states.get(&key)
    }

    /// Numeric state value, or `None` if absent or a string.
    pub fn state_number(&self, key: u16) -> Option<u16> {
        match self.states.get(&key) {
            Some(StateValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn set_state(&mut self, key: u16, value: StateValue) {
        self.states.insert(key, value);
    }

    pub fn clear_state(&mut self, key: u16) {
        self.states.remove(&key);
    }

    pub fn states(&self) -> impl Iterator<Item = (u16, &StateValue)> {
        self.states.iter().map(|(k, v)| (*k, v))
    }

    /// Serializes the map. The layout round-trips byte-exact: signature,
    /// dimensions, tile grid, attribute grid, layers, state registry
    /// (ascending key order), title.
    pub fn write<W: Write>(&self, w: &mut W) -> GameResult<()> {
        w.write_all(MAP_MAGIC).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.width).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.height).map_err(FormatError::Io)?;
        w.write_all(&self.tiles).map_err(FormatError::Io)?;
        w.write_all(&self.attrs).map_err(FormatError::Io)?;

        bytes::write_u8(w, self.layers.len() as u8).map_err(FormatError::Io)?;
        for layer in &self.layers {
            bytes::write_u8(w, layer.kind as u8).map_err(FormatError::Io)?;
            w.write_all(&layer.tiles).map_err(FormatError::Io)?;
        }

        bytes::write_u16(w, self.states.len() as u16).map_err(FormatError::Io)?;
        for (key, value) in &self.states {
            bytes::write_u16(w, *key).map_err(FormatError::Io)?;
            match value {
                StateValue::Number(n) => {
                    bytes::write_u8(w, STATE_TAG_NUMBER).map_err(FormatError::Io)?;
                    bytes::write_u16(w, *n).map_err(FormatError::Io)?;
                }
                StateValue::Text(s) => {
                    bytes::write_u8(w, STATE_TAG_TEXT).map_err(FormatError::Io)?;
                    bytes::write_string(w, s).map_err(FormatError::Io)?;
                }
            }
        }

        bytes::write_string(w, &self.title).map_err(FormatError::Io)?;
        Ok(())
    }

    /// Deserializes a map written by [`TileMap::write`]. On any error the
    /// reader is left mid-stream and no map is produced.
    pub fn read<R: Read>(r: &mut R) -> GameResult<Self> {
        let magic = bytes::read_magic(r).map_err(FormatError::Io)?;
        if &magic != MAP_MAGIC {
            return Err(FormatError::BadMagic {
                expected: "MAZE",
                found: magic,
            }
            .into());
        }
        let width = bytes::read_u16(r).map_err(FormatError::Io)?;
        let height = bytes::read_u16(r).map_err(FormatError::Io)?;
        if width == 0 || height == 0 || width > MAX_BOARD || height > MAX_BOARD {
            return Err(MapError::InvalidDimensions { width, height }.into());
        }
        let cells = width as usize * height as usize;
        let tiles = bytes::read_vec(r, cells).map_err(FormatError::Io)?;
        let attrs = bytes::read_vec(r, cells).map_err(FormatError::Io)?;

        let layer_count = bytes::read_u8(r).map_err(FormatError::Io)?;
        let mut layers = Vec::with_capacity(layer_count as usize);
        for _ in 0..layer_count {
            let kind_byte = bytes::read_u8(r).map_err(FormatError::Io)?;
            let kind = LayerKind::from_repr(kind_byte)
                .ok_or(FormatError::UnknownLayerKind(kind_byte))?;
            let grid = bytes::read_vec(r, cells).map_err(FormatError::Io)?;
            layers.push(MapLayer { kind, tiles: grid });
        }

        let state_count = bytes::read_u16(r).map_err(FormatError::Io)?;
        let mut states = BTreeMap::new();
        for _ in 0..state_count {
            let key = bytes::read_u16(r).map_err(FormatError::Io)?;
            let tag = bytes::read_u8(r).map_err(FormatError::Io)?;
            let value = match tag {
                STATE_TAG_NUMBER => StateValue::Number(bytes::read_u16(r).map_err(FormatError::Io)?),
                STATE_TAG_TEXT => StateValue::Text(bytes::read_string(r)?),
                other => return Err(FormatError::UnknownStateTag(other).into()),
            };
            states.insert(key, value);
        }

        let title = bytes::read_string(r)?;

        Ok(Self {
            width,
            height,
            tiles,
            attrs,
            title,
            layers,
            states,
        })
    }
}

/// Copies a row-major grid into new dimensions, filling uncovered cells.
fn regrid(old: &[u8], ow: u16, oh: u16, nw: u16, nh: u16, fill: u8) -> Vec<u8> {
    let mut out = vec![fill; nw as usize * nh as usize];
    for y in 0..oh.min(nh) as usize {
        let src = y * ow as usize;
        let dst = y * nw as usize;
        let span = ow.min(nw) as usize;
        out[dst..dst + span].copy_from_slice(&old[src..src + span]);
    }
    out
}

/// Rotates a row-major grid one cell with wraparound.
fn shift_grid(grid: &mut [u8], width: usize, dir: Direction) {
    match dir {
        Direction::Left => {
            for row in grid.chunks_exact_mut(width) {
                row.rotate_left(1);
            }
        }
        Direction::Right => {
            for row in grid.chunks_exact_mut(width) {
                row.rotate_right(1);
            }
        }
        Direction::Up => grid.rotate_left(width),
        Direction::Down => grid.rotate_right(width),
    }
}
