use std::io::Cursor;

use mire::game::{Game, GameMode};
use mire::map::archive::MapArchive;
use mire::map::direction::Direction;
use mire::map::{TileMap, TilePoint};
use mire::recorder::{InputFlags, InputRecorder};
use mire::tile::{self, tiles};

/// A quiet room: player in the middle, one diamond tucked in a corner so
/// the level does not complete under the test's feet.
fn room(width: u16, height: u16) -> TileMap {
    let mut map = TileMap::new(width, height, tiles::EMPTY).unwrap();
    map.set(TilePoint::new(2, 2), tiles::PLAYER);
    map.set(TilePoint::new(width as i16 - 1, height as i16 - 1), tiles::DIAMOND);
    map
}

fn archive_of(maps: Vec<TileMap>) -> MapArchive {
    let mut archive = MapArchive::new();
    for map in maps {
        archive.push(map);
    }
    archive
}

fn game_with(map: TileMap) -> Game {
    let mut game = Game::new(archive_of(vec![map]), 0).unwrap();
    game.seed_rng(1);
    game
}

#[test]
fn test_level_load_scans_spawns() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(5, 5), tiles::SLIME);
    map.set(TilePoint::new(6, 2), tiles::DRONE);
    map.set(TilePoint::new(1, 6), tiles::OGRE);
    let game = game_with(map);

    assert_eq!(game.player().pos, TilePoint::new(2, 2));
    assert_eq!(game.map().at(TilePoint::new(2, 2)), tiles::EMPTY);
    assert_eq!(game.actors().len(), 2);
    assert_eq!(game.bosses().len(), 1);
    // Bosses live at double resolution and leave no tile behind.
    assert_eq!(game.bosses()[0].pos, TilePoint::new(2, 12));
    assert_eq!(game.map().at(TilePoint::new(1, 6)), tiles::EMPTY);
    assert_eq!(game.diamonds(), 1);
    assert_eq!(game.health(), game.max_health());
}

#[test]
fn test_diamond_pickup_completes_level() {
    // The end-to-end scenario: a diamond right above the player.
    let mut first = TileMap::new(3, 3, tiles::EMPTY).unwrap();
    first.set(TilePoint::new(1, 0), tiles::DIAMOND);
    first.set(TilePoint::new(1, 1), tiles::PLAYER);
    let second = room(5, 5);

    let mut game = Game::new(archive_of(vec![first, second]), 0).unwrap();
    game.seed_rng(1);
    assert_eq!(game.diamonds(), 1);

    game.tick(InputFlags::UP);

    let diamond_score = tile::def(tiles::DIAMOND).score as u32;
    assert_eq!(game.score(), diamond_score);
    // Goal count hit zero, so the tick ended by advancing the level.
    assert_eq!(game.level(), 1);
    assert_eq!(game.diamonds(), 1);
    assert_eq!(game.mode(), GameMode::Running);
}

#[test]
fn test_level_wraps_after_last() {
    let mut only = TileMap::new(3, 3, tiles::EMPTY).unwrap();
    only.set(TilePoint::new(1, 0), tiles::DIAMOND);
    only.set(TilePoint::new(1, 1), tiles::PLAYER);
    let mut game = game_with(only);

    game.tick(InputFlags::UP);
    assert_eq!(game.level(), 0);
    // Reload restored the diamond and the spawn position.
    assert_eq!(game.diamonds(), 1);
    assert_eq!(game.player().pos, TilePoint::new(1, 1));
}

#[test]
fn test_input_priority_up_wins() {
    let mut game = game_with(room(6, 6));
    game.tick(InputFlags::UP | InputFlags::LEFT | InputFlags::RIGHT);
    assert_eq!(game.player().pos, TilePoint::new(2, 1));
    assert_eq!(game.player().aim, Some(Direction::Up));
}

#[test]
fn test_blocked_input_falls_through_to_next() {
    let mut map = room(6, 6);
    map.set(TilePoint::new(2, 1), tiles::WALL); // up blocked
    let mut game = game_with(map);
    game.tick(InputFlags::UP | InputFlags::LEFT);
    assert_eq!(game.player().pos, TilePoint::new(1, 2));
}

#[test]
fn test_key_collection_is_idempotent() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(3, 2), tiles::KEY_RED);
    map.set(TilePoint::new(4, 2), tiles::KEY_RED);
    let mut game = game_with(map);

    game.tick(InputFlags::RIGHT);
    assert!(game.keys().contains(tiles::KEY_RED));
    assert_eq!(game.keys().len(), 1);

    game.tick(InputFlags::RIGHT);
    // Second copy of the same key consumes no extra slot.
    assert_eq!(game.keys().len(), 1);
    assert_eq!(game.player().pos, TilePoint::new(4, 2));
}

#[test]
fn test_door_opens_with_key() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(3, 2), tiles::KEY_BLUE);
    map.set(TilePoint::new(4, 2), tiles::DOOR_BLUE);
    let mut game = game_with(map);

    game.tick(InputFlags::RIGHT); // key
    game.tick(InputFlags::RIGHT); // through the door
    assert_eq!(game.player().pos, TilePoint::new(4, 2));
}

#[test]
fn test_attribute_trigger_clears_group() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(3, 2), tiles::BERRY);
    map.set_attr(TilePoint::new(3, 2), 4);
    // Two more diamonds in the same trigger group, one unrelated cell.
    map.set(TilePoint::new(6, 6), tiles::DIAMOND);
    map.set_attr(TilePoint::new(6, 6), 4);
    map.set(TilePoint::new(6, 5), tiles::DIAMOND);
    map.set_attr(TilePoint::new(6, 5), 4);
    map.set(TilePoint::new(1, 1), tiles::WALL);
    map.set_attr(TilePoint::new(1, 1), 9);

    let mut game = game_with(map);
    assert_eq!(game.diamonds(), 3);

    game.tick(InputFlags::RIGHT);

    // Both grouped diamonds cleared and counted; the other group is intact.
    assert_eq!(game.diamonds(), 1);
    assert_eq!(game.map().at(TilePoint::new(6, 6)), tiles::EMPTY);
    assert_eq!(game.map().at(TilePoint::new(6, 5)), tiles::EMPTY);
    assert_eq!(game.map().attr(TilePoint::new(6, 6)), 0);
    assert_eq!(game.map().at(TilePoint::new(1, 1)), tiles::WALL);
    assert_eq!(game.map().attr(TilePoint::new(1, 1)), 9);
}

#[test]
fn test_triggered_diamonds_each_count_once() {
    let mut map = room(8, 8);
    // A grouped diamond next to the player plus the room's corner diamond
    // in the same group; a third diamond keeps the level running.
    map.set(TilePoint::new(3, 2), tiles::DIAMOND);
    map.set_attr(TilePoint::new(3, 2), 2);
    map.set_attr(TilePoint::new(7, 7), 2);
    map.set(TilePoint::new(5, 5), tiles::DIAMOND);
    let mut game = game_with(map);
    assert_eq!(game.diamonds(), 3);

    game.tick(InputFlags::RIGHT);
    // Consumed one directly, the trigger cleared the grouped one: exactly
    // two decrements, no double counting.
    assert_eq!(game.diamonds(), 1);
    assert_eq!(game.level(), 0);
}

#[test]
fn test_swamp_damages_while_standing() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(3, 2), tiles::SWAMP);
    let mut game = game_with(map);
    let full = game.health();

    game.tick(InputFlags::RIGHT); // step onto the swamp
    assert_eq!(game.health(), full); // damage lands next tick
    game.tick(InputFlags::empty());
    let per_tick = -tile::def(tiles::SWAMP).health as i32;
    assert_eq!(game.health(), full - per_tick);
    game.tick(InputFlags::empty());
    assert_eq!(game.health(), full - 2 * per_tick);
}

#[test]
fn test_healing_caps_at_max() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(3, 2), tiles::BERRY);
    let mut game = game_with(map);
    game.tick(InputFlags::RIGHT);
    assert_eq!(game.health(), game.max_health());
}

#[test]
fn test_monster_bites_player_ahead() {
    let mut map = room(8, 8);
    // Slime to the right of the player, facing left at spawn.
    map.set(TilePoint::new(3, 2), tiles::SLIME);
    let mut game = game_with(map);
    let full = game.health();

    game.tick(InputFlags::empty());

    let bite = -tile::def(tiles::SLIME).health as i32;
    assert_eq!(game.health(), full - bite);
    // Sticky: stayed put while biting.
    assert_eq!(game.actors()[0].pos, TilePoint::new(3, 2));
}

#[test]
fn test_drone_reverses_at_obstacles() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(5, 5), tiles::DRONE);
    map.set(TilePoint::new(4, 5), tiles::WALL);
    let mut game = game_with(map);

    // Drone class acts on even ticks. Tick 0: blocked left, reverses.
    game.tick(InputFlags::empty());
    assert_eq!(game.actors()[0].pos, TilePoint::new(5, 5));
    assert_eq!(game.actors()[0].aim, Some(Direction::Right));

    game.tick(InputFlags::empty()); // tick 1: throttled
    game.tick(InputFlags::empty()); // tick 2: moves right
    assert_eq!(game.actors()[0].pos, TilePoint::new(6, 5));
    // The drone tile travels with it, restoring the floor behind.
    assert_eq!(game.map().at(TilePoint::new(6, 5)), tiles::DRONE);
    assert_eq!(game.map().at(TilePoint::new(5, 5)), tiles::EMPTY);
}

#[test]
fn test_vine_spreads_into_swamp() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(5, 5), tiles::VINE);
    map.set(TilePoint::new(6, 5), tiles::SWAMP);
    let mut game = game_with(map);
    assert_eq!(game.actors().len(), 1);

    game.tick(InputFlags::empty());

    assert_eq!(game.actors().len(), 2);
    assert_eq!(game.map().at(TilePoint::new(6, 5)), tiles::VINE);
    let spawned = &game.actors()[1];
    assert_eq!(spawned.pos, TilePoint::new(6, 5));
    assert_eq!(spawned.kind, tiles::VINE);
}

#[test]
fn test_vine_infects_adjacent_monster() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(5, 5), tiles::VINE);
    map.set(TilePoint::new(5, 6), tiles::SLIME);
    let mut game = game_with(map);

    game.tick(InputFlags::empty());

    let infected = game.actors().iter().find(|a| a.pos == TilePoint::new(5, 6)).unwrap();
    assert_eq!(infected.kind, tiles::VINE);
    assert_eq!(game.map().at(TilePoint::new(5, 6)), tiles::VINE);
    // Infection converts in place; no new actor appears.
    assert_eq!(game.actors().len(), 2);
}

#[test]
fn test_crusher_kills_and_costs_a_life() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(4, 2), tiles::CRUSHER); // heading left at spawn
    let mut game = game_with(map);

    game.tick(InputFlags::empty()); // crusher to (3,2)
    assert_eq!(game.lives(), mire::constants::START_LIVES);
    game.tick(InputFlags::empty()); // contact: kill, level restarts

    assert_eq!(game.lives(), mire::constants::START_LIVES - 1);
    // Restart put everything back.
    assert_eq!(game.player().pos, TilePoint::new(2, 2));
    assert_eq!(game.actors()[0].pos, TilePoint::new(4, 2));
    assert_eq!(game.mode(), GameMode::Running);
}

#[test]
fn test_crusher_passes_through_godmode_player() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(2, 1), tiles::STAR);
    map.set(TilePoint::new(4, 1), tiles::CRUSHER);
    let mut game = game_with(map);

    game.tick(InputFlags::UP); // collect the star; crusher to (3,1)
    assert!(game.godmode_active());
    game.tick(InputFlags::empty()); // crusher displaces through the player

    assert_eq!(game.lives(), mire::constants::START_LIVES);
    assert!(game.health() > 0);
    assert_eq!(game.actors()[0].pos, TilePoint::new(2, 1));
    assert_eq!(game.player().pos, TilePoint::new(2, 1));
}

#[test]
fn test_extra_speed_doubles_movement() {
    let mut map = room(10, 8);
    map.set(TilePoint::new(3, 2), tiles::BOOTS);
    let mut game = game_with(map);

    game.tick(InputFlags::RIGHT);
    assert_eq!(game.player().pos, TilePoint::new(3, 2));
    game.tick(InputFlags::RIGHT);
    assert_eq!(game.player().pos, TilePoint::new(5, 2));
}

#[test]
fn test_extra_life_pickup() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(3, 2), tiles::HEART);
    let mut game = game_with(map);
    game.tick(InputFlags::RIGHT);
    assert_eq!(game.lives(), mire::constants::START_LIVES + 1);
}

#[test]
fn test_fireball_flies_and_detonates() {
    let mut map = room(10, 8);
    map.set(TilePoint::new(6, 5), tiles::WALL);
    let mut game = game_with(map);
    assert!(game.spawn_actor(TilePoint::new(3, 5), tiles::FIREBALL, Some(Direction::Right)));

    game.tick(InputFlags::empty());
    assert_eq!(game.actors()[0].pos, TilePoint::new(4, 5));
    game.tick(InputFlags::empty());
    assert_eq!(game.actors()[0].pos, TilePoint::new(5, 5));
    game.tick(InputFlags::empty()); // wall ahead: detonates

    assert!(game.actors().is_empty());
    // The floor it covered is restored.
    assert_eq!(game.map().at(TilePoint::new(5, 5)), tiles::EMPTY);
    assert!(game.effects().count() > 0);
}

#[test]
fn test_fireball_detonation_chains_into_ice_cube() {
    let mut map = room(10, 8);
    map.set(TilePoint::new(6, 5), tiles::ICE_CUBE);
    let mut game = game_with(map);
    assert_eq!(game.actors().len(), 1); // the cube, frozen in place
    assert!(game.spawn_actor(TilePoint::new(4, 5), tiles::FIREBALL, Some(Direction::Right)));

    game.tick(InputFlags::empty()); // to (5,5)
    game.tick(InputFlags::empty()); // cube ahead: both go up

    assert!(game.actors().is_empty());
    assert_eq!(game.map().at(TilePoint::new(6, 5)), tiles::EMPTY);
    assert_eq!(game.map().at(TilePoint::new(5, 5)), tiles::EMPTY);
}

#[test]
fn test_spawn_rejects_off_map_and_occupied() {
    let mut game = game_with(room(6, 6));
    assert!(!game.spawn_actor(TilePoint::new(9, 9), tiles::FIREBALL, Some(Direction::Up)));
    assert!(!game.spawn_actor(TilePoint::new(-1, 0), tiles::FIREBALL, Some(Direction::Up)));
    let corner = TilePoint::new(5, 5); // the room's diamond
    assert!(!game.spawn_actor(corner, tiles::FIREBALL, Some(Direction::Up)));
    assert!(game.actors().is_empty());
}

#[test]
fn test_boss_locks_on_when_player_is_close() {
    let mut map = room(16, 16);
    map.set(TilePoint::new(4, 4), tiles::OGRE); // well inside the chase radius
    let mut game = game_with(map);
    use mire::boss::BossState;
    assert_eq!(game.bosses()[0].state(), BossState::Patrol);

    game.tick(InputFlags::empty());
    assert_eq!(game.bosses()[0].state(), BossState::Chase);
}

#[test]
fn test_boss_stays_on_patrol_when_player_is_far() {
    let mut map = room(32, 32);
    map.set(TilePoint::new(30, 30), tiles::OGRE);
    let mut game = game_with(map);
    use mire::boss::BossState;

    for _ in 0..5 {
        game.tick(InputFlags::empty());
        assert_eq!(game.bosses()[0].state(), BossState::Patrol);
    }
}

#[test]
fn test_boss_kill_scores_once() {
    let mut map = room(16, 16);
    map.set(TilePoint::new(12, 12), tiles::OGRE);
    let mut game = game_with(map);
    let boss_score = game.bosses()[0].template().score as u32;
    let hp = game.bosses()[0].hp;

    assert!(game.damage_boss(0, hp));
    assert_eq!(game.score(), boss_score);

    // A dead boss absorbs further hits without scoring again.
    assert!(!game.damage_boss(0, 10));
    assert_eq!(game.score(), boss_score);
}

#[test]
fn test_dead_boss_hides_after_death_animation() {
    let mut map = room(24, 24);
    map.set(TilePoint::new(20, 20), tiles::OGRE);
    let mut game = game_with(map);
    use mire::boss::BossState;
    let hp = game.bosses()[0].hp;
    game.damage_boss(0, hp);

    for _ in 0..8 {
        game.tick(InputFlags::empty());
    }
    assert_eq!(game.bosses()[0].state(), BossState::Hidden);
}

#[test]
fn test_score_threshold_awards_bonus_life() {
    let mut map = room(8, 8);
    map.set(TilePoint::new(4, 1), tiles::WRAITH);
    let mut game = game_with(map);
    let lives = game.lives();

    // One wraith is worth 3500 points, short of the 5000 line.
    let hp = game.bosses()[0].hp;
    game.damage_boss(0, hp);
    assert_eq!(game.lives(), lives);
    // A second kill (score persists across a level reload) crosses it.
    game.restart_level().unwrap();
    let hp = game.bosses()[0].hp;
    game.damage_boss(0, hp);
    assert_eq!(game.score(), 7000);
    assert_eq!(game.lives(), lives + 1);
}

#[test]
fn test_save_round_trip() {
    let mut map = room(10, 10);
    map.set(TilePoint::new(3, 2), tiles::KEY_RED);
    map.set(TilePoint::new(5, 5), tiles::SLIME);
    map.set(TilePoint::new(7, 7), tiles::OGRE);
    let archive = archive_of(vec![map]);

    let mut game = Game::new(archive.clone(), 1).unwrap();
    game.seed_rng(9);
    game.tick(InputFlags::RIGHT); // pick up the key, let the world move

    let mut buf = Vec::new();
    game.save(&mut buf).unwrap();

    let mut restored = Game::new(archive, 0).unwrap();
    restored.load(&mut Cursor::new(buf.clone())).unwrap();

    assert_eq!(restored.score(), game.score());
    assert_eq!(restored.lives(), game.lives());
    assert_eq!(restored.health(), game.health());
    assert_eq!(restored.level(), game.level());
    assert_eq!(restored.diamonds(), game.diamonds());
    assert_eq!(restored.skill(), game.skill());
    assert_eq!(restored.player(), game.player());
    assert_eq!(restored.actors(), game.actors());
    assert_eq!(restored.bosses(), game.bosses());
    assert_eq!(restored.map(), game.map());
    assert!(restored.keys().contains(tiles::KEY_RED));

    // Byte-exact: saving the restored game reproduces the stream.
    let mut again = Vec::new();
    restored.save(&mut again).unwrap();
    assert_eq!(buf, again);
}

#[test]
fn test_failed_load_leaves_state_untouched() {
    let mut game = game_with(room(8, 8));
    game.tick(InputFlags::RIGHT);
    let pos = game.player().pos;
    let score = game.score();

    let mut buf = Vec::new();
    game.save(&mut buf).unwrap();
    buf[0] = b'X';
    assert!(game.load(&mut Cursor::new(buf)).is_err());

    assert_eq!(game.player().pos, pos);
    assert_eq!(game.score(), score);
    assert_eq!(game.mode(), GameMode::Running);
}

#[test]
fn test_load_rejects_version_mismatch() {
    let mut game = game_with(room(8, 8));
    let mut buf = Vec::new();
    game.save(&mut buf).unwrap();
    buf[4..8].copy_from_slice(&77u32.to_le_bytes());
    assert!(game.load(&mut Cursor::new(buf)).is_err());
}

#[test]
fn test_recorded_replay_is_deterministic() {
    let build = || {
        let mut map = room(12, 12);
        map.set(TilePoint::new(6, 6), tiles::SLIME);
        map.set(TilePoint::new(8, 3), tiles::OGRE);
        map.set(TilePoint::new(3, 2), tiles::BERRY);
        let mut game = Game::new(archive_of(vec![map]), 1).unwrap();
        game.seed_rng(42);
        game
    };

    let mut recorder = InputRecorder::new();
    let script = [
        InputFlags::RIGHT,
        InputFlags::RIGHT,
        InputFlags::empty(),
        InputFlags::DOWN,
        InputFlags::DOWN,
        InputFlags::empty(),
        InputFlags::LEFT,
        InputFlags::empty(),
        InputFlags::UP,
        InputFlags::empty(),
    ];

    let mut first = build();
    for input in script {
        recorder.record(input);
        first.tick(input);
    }

    // Persist the recording and drive a fresh game from it.
    let mut buf = Cursor::new(Vec::new());
    recorder.write(&mut buf).unwrap();
    buf.set_position(0);
    let loaded = InputRecorder::read(&mut buf).unwrap();

    let mut second = build();
    for input in loaded.replay() {
        second.tick(input);
    }

    assert_eq!(first.player(), second.player());
    assert_eq!(first.score(), second.score());
    assert_eq!(first.health(), second.health());
    assert_eq!(first.actors(), second.actors());
    assert_eq!(first.bosses(), second.bosses());
    assert_eq!(first.map(), second.map());
}

#[test]
fn test_level_countdown_costs_a_life() {
    use mire::map::{state_keys, StateValue};
    let mut map = room(8, 8);
    map.set_state(state_keys::TIMEOUT, StateValue::Number(3));
    let mut game = game_with(map);
    assert_eq!(game.time_left(), 3);
    let lives = game.lives();

    game.tick(InputFlags::empty());
    game.tick(InputFlags::empty());
    assert_eq!(game.time_left(), 1);
    assert_eq!(game.lives(), lives);

    game.tick(InputFlags::empty());
    // Out of time: one life gone, level (and its countdown) reset.
    assert_eq!(game.lives(), lives - 1);
    assert_eq!(game.time_left(), 3);
}

#[test]
fn test_untimed_level_never_runs_out() {
    let mut game = game_with(room(8, 8));
    assert_eq!(game.time_left(), 0);
    for _ in 0..50 {
        game.tick(InputFlags::empty());
    }
    assert_eq!(game.lives(), mire::constants::START_LIVES);
}

#[test]
fn test_game_over_when_out_of_lives() {
    let mut map = TileMap::new(4, 4, tiles::EMPTY).unwrap();
    map.set(TilePoint::new(1, 1), tiles::PLAYER);
    map.set(TilePoint::new(2, 1), tiles::CRUSHER);
    map.set(TilePoint::new(3, 3), tiles::DIAMOND);
    let mut game = game_with(map);

    // Each contact costs a life and restarts; burn through all of them.
    let mut guard = 0;
    while game.mode() == GameMode::Running {
        game.tick(InputFlags::empty());
        guard += 1;
        assert!(guard < 100, "game never ended");
    }
    assert_eq!(game.lives(), 0);
    assert_eq!(game.mode(), GameMode::GameOver);

    // Ticks are inert after game over.
    let pos = game.player().pos;
    game.tick(InputFlags::RIGHT);
    assert_eq!(game.player().pos, pos);
}
