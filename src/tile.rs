//! Tile identifiers and their semantic definitions.
//!
//! Every grid cell holds a single byte; this module maps that byte to an
//! immutable [`TileDef`] describing how the simulation treats the cell.
//! The catalog is built once at compile time and never mutated.

use bitflags::bitflags;
use strum_macros::{AsRefStr, FromRepr};

/// Semantic class of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, FromRepr)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum TileCategory {
    /// Open floor; passable by everything.
    Background,
    /// Blocks monsters but not the player.
    Stop,
    /// Player spawn marker.
    Player,
    Wall,
    Pickup,
    Door,
    Key,
    /// Damaging terrain. Monsters treat it as floor; vines spread into it.
    Swamp,
    Monster,
    Drone,
    VinePlant,
    Diamond,
    IceCube,
    Crusher,
    Fireball,
    Boulder,
    /// Boss spawn marker.
    Boss,
}

bitflags! {
    /// Behavior flags attached to a tile definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TileFlags: u16 {
        /// Keep damaging without displacing while in contact.
        const STICKY = 1 << 0;
        /// After the primary move, scan all four directions for the player.
        const ROUND = 1 << 1;
        /// Turn to face the player when detected adjacent.
        const FOCUS = 1 << 2;
        /// Scan the turn-preference table front-to-back (left-hugging).
        const REVERSE = 1 << 3;
        /// Pickup grants an extra life.
        const EXTRA_LIFE = 1 << 4;
        /// Pickup starts the invulnerability timer.
        const GODMODE = 1 << 5;
        /// Pickup starts the speed timer.
        const EXTRA_SPEED = 1 << 6;
    }
}

/// Immutable definition of one tile id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDef {
    pub category: TileCategory,
    /// Points awarded when consumed or trigger-cleared.
    pub score: u16,
    /// Health delta on contact: positive heals (pickups), negative damages
    /// (terrain, monster contact).
    pub health: i16,
    pub flags: TileFlags,
    /// Index into [`crate::constants::SPEED_CLASSES`].
    pub speed: u8,
}

impl TileDef {
    const fn of(category: TileCategory) -> Self {
        Self {
            category,
            score: 0,
            health: 0,
            flags: TileFlags::empty(),
            speed: 0,
        }
    }

    const fn score(mut self, score: u16) -> Self {
        self.score = score;
        self
    }

    const fn health(mut self, health: i16) -> Self {
        self.health = health;
        self
    }

    const fn flags(mut self, flags: TileFlags) -> Self {
        self.flags = flags;
        self
    }

    const fn speed(mut self, speed: u8) -> Self {
        self.speed = speed;
        self
    }
}

/// Well-known tile ids. Ids not listed here resolve to plain background.
pub mod tiles {
    pub const EMPTY: u8 = 0x00;
    pub const WALL: u8 = 0x01;
    pub const BRICK: u8 = 0x02;
    /// Monster-stopping marker the player walks straight through.
    pub const ROCK: u8 = 0x03;
    pub const PLAYER: u8 = 0x04;
    pub const SWAMP: u8 = 0x05;
    pub const DIAMOND: u8 = 0x06;
    pub const BERRY: u8 = 0x07;
    pub const MUSHROOM: u8 = 0x08;
    pub const HEART: u8 = 0x09;
    pub const STAR: u8 = 0x0A;
    pub const BOOTS: u8 = 0x0B;

    // Doors sit on even ids with their matching key directly above them;
    // `matching_key` depends on this spacing.
    pub const DOOR_RED: u8 = 0x10;
    pub const KEY_RED: u8 = 0x11;
    pub const DOOR_BLUE: u8 = 0x12;
    pub const KEY_BLUE: u8 = 0x13;
    pub const DOOR_GREEN: u8 = 0x14;
    pub const KEY_GREEN: u8 = 0x15;
    pub const DOOR_GOLD: u8 = 0x16;
    pub const KEY_GOLD: u8 = 0x17;

    pub const SLIME: u8 = 0x20;
    pub const WASP: u8 = 0x21;
    pub const BEETLE: u8 = 0x22;
    pub const ADDER: u8 = 0x23;
    pub const DRONE: u8 = 0x28;
    pub const VINE: u8 = 0x29;
    pub const ICE_CUBE: u8 = 0x2A;
    pub const FIREBALL: u8 = 0x2B;
    pub const BOULDER: u8 = 0x2C;

    /// First of eight crusher ids; the low three bits of the id are the
    /// crusher's speed class.
    pub const CRUSHER: u8 = 0x30;

    pub const OGRE: u8 = 0x40;
    pub const WRAITH: u8 = 0x41;
}

/// True for any of the eight crusher ids.
pub const fn is_crusher(id: u8) -> bool {
    id & 0xF8 == tiles::CRUSHER
}

/// Speed class encoded in a crusher's id byte.
pub const fn crusher_speed_class(id: u8) -> u8 {
    debug_assert!(is_crusher(id));
    id & 0x07
}

/// The key tile id that opens a given door tile.
pub const fn matching_key(door: u8) -> u8 {
    door + 1
}

const fn build_catalog() -> [TileDef; 256] {
    use TileCategory::*;
    let mut defs = [TileDef::of(Background); 256];

    defs[tiles::WALL as usize] = TileDef::of(Wall);
    defs[tiles::BRICK as usize] = TileDef::of(Wall);
    defs[tiles::ROCK as usize] = TileDef::of(Stop);
    defs[tiles::PLAYER as usize] = TileDef::of(Player);
    defs[tiles::SWAMP as usize] = TileDef::of(Swamp).health(-2);
    defs[tiles::DIAMOND as usize] = TileDef::of(Diamond).score(100);
    defs[tiles::BERRY as usize] = TileDef::of(Pickup).score(10).health(10);
    defs[tiles::MUSHROOM as usize] = TileDef::of(Pickup).score(50).health(4);
    defs[tiles::HEART as usize] = TileDef::of(Pickup).flags(TileFlags::EXTRA_LIFE);
    defs[tiles::STAR as usize] = TileDef::of(Pickup).score(25).flags(TileFlags::GODMODE);
    defs[tiles::BOOTS as usize] = TileDef::of(Pickup).score(25).flags(TileFlags::EXTRA_SPEED);

    let mut door = tiles::DOOR_RED;
    while door <= tiles::DOOR_GOLD {
        defs[door as usize] = TileDef::of(Door);
        defs[matching_key(door) as usize] = TileDef::of(Key).score(50);
        door += 2;
    }

    defs[tiles::SLIME as usize] = TileDef::of(Monster).health(-5).flags(TileFlags::STICKY).speed(2);
    defs[tiles::WASP as usize] = TileDef::of(Monster)
        .health(-8)
        .flags(TileFlags::ROUND.union(TileFlags::FOCUS))
        .speed(1);
    defs[tiles::BEETLE as usize] = TileDef::of(Monster)
        .health(-10)
        .flags(TileFlags::STICKY.union(TileFlags::ROUND).union(TileFlags::FOCUS))
        .speed(3);
    defs[tiles::ADDER as usize] = TileDef::of(Monster).health(-6).flags(TileFlags::REVERSE).speed(2);
    defs[tiles::DRONE as usize] = TileDef::of(Drone).health(-10).speed(2);
    defs[tiles::VINE as usize] = TileDef::of(VinePlant).health(-4).speed(4);
    defs[tiles::ICE_CUBE as usize] = TileDef::of(IceCube).speed(1);
    defs[tiles::FIREBALL as usize] = TileDef::of(Fireball).health(-15);
    defs[tiles::BOULDER as usize] = TileDef::of(Boulder);

    let mut i = 0u8;
    while i < 8 {
        defs[(tiles::CRUSHER + i) as usize] = TileDef::of(Crusher).speed(i);
        i += 1;
    }

    defs[tiles::OGRE as usize] = TileDef::of(Boss);
    defs[tiles::WRAITH as usize] = TileDef::of(Boss);

    defs
}

static CATALOG: [TileDef; 256] = build_catalog();

/// Looks up the definition for a tile id. Total: unknown ids are background.
pub fn def(id: u8) -> &'static TileDef {
    &CATALOG[id as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_ids_are_background() {
        assert_eq!(def(0xFF).category, TileCategory::Background);
        assert_eq!(def(0x7C).category, TileCategory::Background);
    }

    #[test]
    fn test_door_key_pairing() {
        assert_eq!(matching_key(tiles::DOOR_RED), tiles::KEY_RED);
        assert_eq!(matching_key(tiles::DOOR_GOLD), tiles::KEY_GOLD);
        for door in [tiles::DOOR_RED, tiles::DOOR_BLUE, tiles::DOOR_GREEN, tiles::DOOR_GOLD] {
            assert_eq!(def(door).category, TileCategory::Door);
            assert_eq!(def(matching_key(door)).category, TileCategory::Key);
        }
    }

    #[test]
    fn test_crusher_speed_bitfield() {
        for i in 0..8u8 {
            let id = tiles::CRUSHER + i;
            assert!(is_crusher(id));
            assert_eq!(crusher_speed_class(id), i);
            assert_eq!(def(id).category, TileCategory::Crusher);
        }
        assert!(!is_crusher(tiles::CRUSHER + 8));
        assert!(!is_crusher(tiles::DRONE));
    }

    #[test]
    fn test_monster_flags_match_dispatch() {
        assert!(def(tiles::SLIME).flags.contains(TileFlags::STICKY));
        assert!(!def(tiles::SLIME).flags.contains(TileFlags::ROUND));
        assert!(def(tiles::WASP).flags.contains(TileFlags::ROUND | TileFlags::FOCUS));
        assert!(def(tiles::BEETLE).flags.contains(TileFlags::STICKY | TileFlags::ROUND | TileFlags::FOCUS));
        assert!(def(tiles::ADDER).flags.contains(TileFlags::REVERSE));
        // Drones never use the turn table, so no drone carries ROUND.
        assert!(!def(tiles::DRONE).flags.intersects(TileFlags::ROUND | TileFlags::REVERSE));
    }

    #[test]
    fn test_speed_classes_in_table_range() {
        for id in 0..=255u8 {
            assert!((def(id).speed as usize) < crate::constants::SPEED_CLASSES.len());
        }
    }

    #[test]
    fn test_damaging_tiles_have_negative_health() {
        assert!(def(tiles::SWAMP).health < 0);
        assert!(def(tiles::SLIME).health < 0);
        assert!(def(tiles::FIREBALL).health < 0);
        assert!(def(tiles::BERRY).health > 0);
    }
}
