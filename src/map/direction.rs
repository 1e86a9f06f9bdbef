//! The four cardinal directions and the patrol turn-preference table.

use glam::I16Vec2;
use strum_macros::AsRefStr;

use crate::error::FormatError;

/// The four cardinal directions. The y axis grows downward, so `Up` is
/// negative y. Absence of a direction ("no direction could be found", a
/// halted ice cube) is modeled as `Option<Direction>` with `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, AsRefStr)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    #[default]
    Right,
}

/// Byte value reserved for "no direction" in the actor serial format.
const AIM_NONE: u8 = 4;

impl Direction {
    /// The four cardinal directions.
    /// This is just a convenience constant for iterating over the directions.
    pub const DIRECTIONS: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Returns the opposite direction. Constant time.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// One-cell displacement for this direction.
    pub const fn offset(self) -> I16Vec2 {
        match self {
            Direction::Up => I16Vec2::new(0, -1),
            Direction::Down => I16Vec2::new(0, 1),
            Direction::Left => I16Vec2::new(-1, 0),
            Direction::Right => I16Vec2::new(1, 0),
        }
    }

    /// Returns the direction as a usize (0-3). Constant time.
    /// This is useful for indexing into arrays.
    pub const fn as_usize(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub const fn from_byte(value: u8) -> Option<Direction> {
        match value {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }

    /// Encodes an optional facing as a single byte (4 = none).
    pub fn encode_aim(aim: Option<Direction>) -> u8 {
        match aim {
            Some(dir) => dir.as_usize() as u8,
            None => AIM_NONE,
        }
    }

    /// Decodes a facing byte written by [`Direction::encode_aim`].
    pub fn decode_aim(value: u8) -> Result<Option<Direction>, FormatError> {
        if value == AIM_NONE {
            return Ok(None);
        }
        match Direction::from_byte(value) {
            Some(dir) => Ok(Some(dir)),
            None => Err(FormatError::UnknownDirection(value)),
        }
    }
}

impl From<Direction> for I16Vec2 {
    fn from(dir: Direction) -> Self {
        dir.offset()
    }
}

/// Preferred try-order of the four directions, per current facing.
///
/// The slice for a facing is scanned *last-to-first*, so it is laid out
/// back, left, forward, right: a patroller first tries turning right, then
/// going straight, then left, and reverses only as a last resort. Scanning
/// the slice front-to-back instead (the `Reverse` tile flag) yields a
/// left-hugging patrol.
const TURN_TABLE: [Direction; 16] = [
    // facing Up
    Direction::Down,
    Direction::Left,
    Direction::Up,
    Direction::Right,
    // facing Down
    Direction::Up,
    Direction::Right,
    Direction::Down,
    Direction::Left,
    // facing Left
    Direction::Right,
    Direction::Down,
    Direction::Left,
    Direction::Up,
    // facing Right
    Direction::Left,
    Direction::Up,
    Direction::Right,
    Direction::Down,
];

/// The four-entry turn-preference slice for a facing.
pub fn turn_preference(facing: Direction) -> &'static [Direction] {
    let base = facing.as_usize() * 4;
    &TURN_TABLE[base..base + 4]
}
