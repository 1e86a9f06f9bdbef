use std::io::Cursor;

use mire::actor::{Actor, KeyRing};
use mire::map::direction::Direction;
use mire::map::{TileMap, TilePoint};
use mire::tile::tiles;

fn open_map() -> TileMap {
    TileMap::new(5, 5, tiles::EMPTY).unwrap()
}

#[test]
fn test_player_passes_soft_tiles() {
    let mut map = open_map();
    map.set(TilePoint::new(3, 2), tiles::SWAMP);
    map.set(TilePoint::new(2, 1), tiles::BERRY);
    map.set(TilePoint::new(1, 2), tiles::DIAMOND);
    map.set(TilePoint::new(2, 3), tiles::ROCK);
    let keys = KeyRing::new();
    let player = Actor::new(TilePoint::new(2, 2), tiles::PLAYER);

    assert!(player.can_move(&map, &keys, Direction::Right)); // swamp
    assert!(player.can_move(&map, &keys, Direction::Up)); // pickup
    assert!(player.can_move(&map, &keys, Direction::Left)); // diamond
    assert!(player.can_move(&map, &keys, Direction::Down)); // stop marker
}

#[test]
fn test_player_blocked_by_walls() {
    let mut map = open_map();
    map.set(TilePoint::new(3, 2), tiles::WALL);
    let keys = KeyRing::new();
    let player = Actor::new(TilePoint::new(2, 2), tiles::PLAYER);
    assert!(!player.can_move(&map, &keys, Direction::Right));
}

#[test]
fn test_door_needs_matching_key() {
    let mut map = open_map();
    map.set(TilePoint::new(3, 2), tiles::DOOR_RED);
    let player = Actor::new(TilePoint::new(2, 2), tiles::PLAYER);

    let mut keys = KeyRing::new();
    assert!(!player.can_move(&map, &keys, Direction::Right));

    keys.insert(tiles::KEY_BLUE);
    assert!(!player.can_move(&map, &keys, Direction::Right));

    keys.insert(tiles::KEY_RED);
    assert!(player.can_move(&map, &keys, Direction::Right));
}

#[test]
fn test_monsters_only_pass_background() {
    // Collision asymmetry: every soft tile the player may enter still
    // blocks a monster.
    let mut map = open_map();
    map.set(TilePoint::new(3, 2), tiles::SWAMP);
    map.set(TilePoint::new(2, 1), tiles::BERRY);
    map.set(TilePoint::new(1, 2), tiles::DIAMOND);
    map.set(TilePoint::new(2, 3), tiles::ROCK);
    let keys = KeyRing::new();

    for kind in [tiles::SLIME, tiles::DRONE, tiles::VINE, tiles::ICE_CUBE, tiles::CRUSHER] {
        let monster = Actor::new(TilePoint::new(2, 2), kind);
        assert!(!monster.can_move(&map, &keys, Direction::Right), "{kind:#04x} entered swamp");
        assert!(!monster.can_move(&map, &keys, Direction::Up), "{kind:#04x} entered pickup");
        assert!(!monster.can_move(&map, &keys, Direction::Left), "{kind:#04x} entered diamond");
        assert!(!monster.can_move(&map, &keys, Direction::Down), "{kind:#04x} entered stop");
    }
}

#[test]
fn test_edge_blocks_everyone() {
    let map = open_map();
    let keys = KeyRing::new();
    let actor = Actor::new(TilePoint::new(0, 0), tiles::SLIME);
    assert!(!actor.can_move(&map, &keys, Direction::Up));
    assert!(!actor.can_move(&map, &keys, Direction::Left));
    assert!(actor.can_move(&map, &keys, Direction::Right));
}

#[test]
fn test_step_swaps_under_tile() {
    let mut map = open_map();
    map.set(TilePoint::new(2, 2), tiles::SLIME);
    map.set(TilePoint::new(3, 2), tiles::EMPTY);
    let mut monster = Actor::new(TilePoint::new(2, 2), tiles::SLIME);
    monster.under = tiles::SWAMP; // was standing on swamp

    monster.step(&mut map, Direction::Right);

    assert_eq!(monster.pos, TilePoint::new(3, 2));
    // Origin cell got the swamp back; the monster tile moved over.
    assert_eq!(map.at(TilePoint::new(2, 2)), tiles::SWAMP);
    assert_eq!(map.at(TilePoint::new(3, 2)), tiles::SLIME);
    assert_eq!(monster.under, tiles::EMPTY);
}

#[test]
fn test_step_is_reversible() {
    let mut map = open_map();
    map.set(TilePoint::new(2, 2), tiles::SLIME);
    let mut monster = Actor::new(TilePoint::new(2, 2), tiles::SLIME);
    monster.under = tiles::SWAMP;
    let before: Vec<u8> = map.cells().map(|c| map.at(c)).collect();
    let under_before = monster.under;

    monster.step(&mut map, Direction::Right);
    monster.step(&mut map, Direction::Left);

    let after: Vec<u8> = map.cells().map(|c| map.at(c)).collect();
    assert_eq!(before, after);
    assert_eq!(monster.pos, TilePoint::new(2, 2));
    assert_eq!(monster.under, under_before);
}

#[test]
fn test_wall_hugging_prefers_right_turn() {
    // Open room: a monster facing up with all directions free turns right.
    let map = open_map();
    let keys = KeyRing::new();
    let mut monster = Actor::new(TilePoint::new(2, 2), tiles::SLIME);
    monster.aim = Some(Direction::Up);
    assert_eq!(monster.next_open_direction(&map, &keys), Some(Direction::Right));
}

#[test]
fn test_wall_hugging_falls_through_blocked_choices() {
    let mut map = open_map();
    map.set(TilePoint::new(3, 2), tiles::WALL); // right of (2,2)
    map.set(TilePoint::new(2, 1), tiles::WALL); // above
    let keys = KeyRing::new();
    let mut monster = Actor::new(TilePoint::new(2, 2), tiles::SLIME);
    monster.aim = Some(Direction::Up);
    // Right turn and straight ahead blocked; next preference is left.
    assert_eq!(monster.next_open_direction(&map, &keys), Some(Direction::Left));
}

#[test]
fn test_wall_hugging_boxed_in() {
    let mut map = open_map();
    for dir in Direction::DIRECTIONS {
        let cell = map.translate(TilePoint::new(2, 2), dir);
        map.set(cell, tiles::WALL);
    }
    let keys = KeyRing::new();
    let monster = Actor::new(TilePoint::new(2, 2), tiles::SLIME);
    assert_eq!(monster.next_open_direction(&map, &keys), None);
}

#[test]
fn test_reverse_flag_hugs_the_other_wall() {
    // The adder scans the table front-to-back: facing up in the open it
    // reverses preference and tries its back first.
    let map = open_map();
    let keys = KeyRing::new();
    let mut adder = Actor::new(TilePoint::new(2, 2), tiles::ADDER);
    adder.aim = Some(Direction::Up);
    assert_eq!(adder.next_open_direction(&map, &keys), Some(Direction::Down));
}

#[test]
fn test_serial_round_trip() {
    let mut actor = Actor::new(TilePoint::new(17, 203), tiles::DRONE);
    actor.aim = Some(Direction::Down);
    actor.under = tiles::SWAMP;

    let mut buf = Vec::new();
    actor.write(&mut buf).unwrap();
    assert_eq!(buf.len(), 5);
    let loaded = Actor::read(&mut Cursor::new(buf)).unwrap();
    assert_eq!(actor, loaded);
}

#[test]
fn test_serial_round_trip_no_aim() {
    let mut cube = Actor::new(TilePoint::new(0, 0), tiles::ICE_CUBE);
    cube.aim = None;
    let mut buf = Vec::new();
    cube.write(&mut buf).unwrap();
    let loaded = Actor::read(&mut Cursor::new(buf)).unwrap();
    assert_eq!(loaded.aim, None);
    assert_eq!(cube, loaded);
}

#[test]
fn test_serial_round_trip_boundary_positions() {
    for pos in [TilePoint::new(0, 0), TilePoint::new(255, 255)] {
        let actor = Actor::new(pos, tiles::SLIME);
        let mut buf = Vec::new();
        actor.write(&mut buf).unwrap();
        assert_eq!(Actor::read(&mut Cursor::new(buf)).unwrap(), actor);
    }
}

#[test]
fn test_serial_rejects_bad_aim_byte() {
    let bytes = [3u8, 3, tiles::SLIME, 9, 0];
    assert!(Actor::read(&mut Cursor::new(bytes)).is_err());
}

#[test]
fn test_write_rejects_out_of_range_position() {
    let actor = Actor::new(TilePoint::new(300, 0), tiles::SLIME);
    let mut buf = Vec::new();
    assert!(actor.write(&mut buf).is_err());
}

#[test]
fn test_key_ring_serial_round_trip() {
    let mut keys = KeyRing::new();
    keys.insert(tiles::KEY_GOLD);
    keys.insert(tiles::KEY_RED);

    let mut buf = Vec::new();
    keys.write(&mut buf).unwrap();
    assert_eq!(buf.len(), mire::constants::MAX_KEYS);
    // Slot layout is positional: first two slots filled, rest empty.
    assert_eq!(buf[0], tiles::KEY_GOLD);
    assert_eq!(buf[1], tiles::KEY_RED);
    assert!(buf[2..].iter().all(|&b| b == 0));

    let loaded = KeyRing::read(&mut Cursor::new(buf)).unwrap();
    assert_eq!(keys, loaded);
}

#[test]
fn test_empty_key_ring_serial_round_trip() {
    let keys = KeyRing::new();
    let mut buf = Vec::new();
    keys.write(&mut buf).unwrap();
    let loaded = KeyRing::read(&mut Cursor::new(buf)).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(keys, loaded);
}
