//! The simulation proper: owned game state, the per-tick update sequence,
//! scoring and health bookkeeping, level transitions and the save-game
//! format.

mod ai;
pub mod events;

use std::collections::VecDeque;
use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::actor::{Actor, KeyRing};
use crate::boss::{self, Boss};
use crate::bytes;
use crate::constants::{
    BASE_HEALTH, BOSS_GRANULARITY, EFFECT_TTL, EXTRA_SPEED_DURATION, GODMODE_DURATION,
    LIFE_BONUS_STEP, MAX_LIVES, SAVE_MAGIC, SAVE_VERSION, START_LIVES,
};
use crate::error::{FormatError, GameError, GameResult, MapError};
use crate::map::archive::MapArchive;
use crate::map::direction::Direction;
use crate::map::{state_keys, TileMap, TilePoint};
use crate::recorder::InputFlags;
use crate::rng::GameRng;
use crate::tile::{self, tiles, TileCategory, TileFlags};
use events::{sounds, AudioSink, Effect, EffectEvent, NullAudio};

/// Coarse run state exposed to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Running,
    GameOver,
}

/// The whole simulation: one live level plus the save-game bookkeeping.
///
/// Everything here is exclusively owned; a tick mutates state synchronously
/// and nothing is shared across threads. Levels are copied out of the
/// archive on load, so the live map never aliases the archived one.
pub struct Game {
    pub(crate) archive: MapArchive,
    pub(crate) map: TileMap,
    pub(crate) player: Actor,
    pub(crate) actors: Vec<Actor>,
    pub(crate) bosses: Vec<Boss>,
    pub(crate) level: u16,
    pub(crate) lives: u16,
    pub(crate) health: i32,
    pub(crate) score: u32,
    pub(crate) next_life_score: u32,
    pub(crate) diamonds: u32,
    pub(crate) godmode_ticks: u16,
    pub(crate) speed_ticks: u16,
    /// Level countdown; 0 means the level has no time limit.
    pub(crate) timeout_ticks: u16,
    pub(crate) keys: KeyRing,
    pub(crate) skill: u8,
    pub(crate) tick: u64,
    pub(crate) mode: GameMode,
    pub(crate) rng: GameRng,
    pub(crate) effects: VecDeque<EffectEvent>,
    pub(crate) audio: Box<dyn AudioSink>,
}

impl Game {
    /// Starts a new game on the first level of the archive.
    pub fn new(archive: MapArchive, skill: u8) -> GameResult<Self> {
        if archive.is_empty() {
            return Err(GameError::InvalidState("archive has no maps".into()));
        }
        let mut game = Self {
            archive,
            map: TileMap::new(1, 1, tiles::EMPTY)?,
            player: Actor::new(TilePoint::ZERO, tiles::PLAYER),
            actors: Vec::new(),
            bosses: Vec::new(),
            level: 0,
            lives: START_LIVES,
            health: 0,
            score: 0,
            next_life_score: LIFE_BONUS_STEP * (skill as u32 + 1),
            diamonds: 0,
            godmode_ticks: 0,
            speed_ticks: 0,
            timeout_ticks: 0,
            keys: KeyRing::new(),
            skill,
            tick: 0,
            mode: GameMode::Running,
            rng: GameRng::default(),
            effects: VecDeque::new(),
            audio: Box::new(NullAudio),
        };
        game.load_level(0)?;
        Ok(game)
    }

    // --- read accessors for the shell/renderer ---

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn player(&self) -> &Actor {
        &self.player
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn bosses(&self) -> &[Boss] {
        &self.bosses
    }

    pub fn level(&self) -> u16 {
        self.level
    }

    pub fn lives(&self) -> u16 {
        self.lives
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    /// Effective health cap for the current skill level.
    pub fn max_health(&self) -> i32 {
        boss::scale_by_skill(BASE_HEALTH as u16, self.skill) as i32
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn diamonds(&self) -> u32 {
        self.diamonds
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    pub fn skill(&self) -> u8 {
        self.skill
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn godmode_active(&self) -> bool {
        self.godmode_ticks > 0
    }

    /// Remaining ticks on the level countdown; 0 when the level is
    /// untimed.
    pub fn time_left(&self) -> u16 {
        self.timeout_ticks
    }

    /// Pending visual effects, oldest first.
    pub fn effects(&self) -> impl Iterator<Item = &EffectEvent> {
        self.effects.iter()
    }

    /// Pops the oldest pending effect.
    pub fn poll_effect(&mut self) -> Option<EffectEvent> {
        self.effects.pop_front()
    }

    // --- mutators ---

    pub fn set_audio(&mut self, audio: Box<dyn AudioSink>) {
        self.audio = audio;
    }

    /// Reseeds the random source; pair with a fresh recording for
    /// deterministic playback.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = GameRng::seeded(seed);
    }

    pub fn set_skill(&mut self, skill: u8) {
        self.skill = skill;
    }

    /// Loads a level out of the archive, replacing the live map and
    /// respawning actors and bosses from its tiles. Per-level state
    /// (health, keys, timers, goal count) resets; lives and score persist.
    pub fn load_level(&mut self, index: u16) -> GameResult<()> {
        let map = self
            .archive
            .get(index as usize)
            .ok_or(MapError::IndexOutOfRange {
                index: index as usize,
                len: self.archive.len(),
            })?
            .clone();
        self.map = map;
        self.level = index;

        let spawn = self
            .map
            .find_first(tiles::PLAYER)
            .ok_or(MapError::NoPlayerSpawn)?;
        self.map.set(spawn, tiles::EMPTY);
        self.player = Actor {
            pos: spawn,
            kind: tiles::PLAYER,
            aim: Some(Direction::Right),
            under: tiles::EMPTY,
        };

        self.actors.clear();
        self.bosses.clear();
        let mut boss_spawns: Vec<(TilePoint, u8)> = Vec::new();
        for cell in self.map.cells() {
            let id = self.map.at(cell);
            match tile::def(id).category {
                TileCategory::Monster
                | TileCategory::Drone
                | TileCategory::VinePlant
                | TileCategory::Crusher
                | TileCategory::Boulder => self.actors.push(Actor::new(cell, id)),
                TileCategory::IceCube => {
                    let mut cube = Actor::new(cell, id);
                    cube.aim = None;
                    self.actors.push(cube);
                }
                TileCategory::Boss => boss_spawns.push((cell, id)),
                _ => {}
            }
        }
        for (cell, id) in boss_spawns {
            self.map.set(cell, tiles::EMPTY);
            match Boss::new(id, cell * BOSS_GRANULARITY, self.skill) {
                Some(boss) => self.bosses.push(boss),
                None => warn!(kind = id, "boss tile without a template; dropped"),
            }
        }

        self.diamonds = self.map.count(tiles::DIAMOND) as u32;
        self.health = self.max_health();
        self.keys.clear();
        self.godmode_ticks = 0;
        self.speed_ticks = 0;
        self.timeout_ticks = self.map.state_number(state_keys::TIMEOUT).unwrap_or(0);
        self.effects.clear();
        self.mode = GameMode::Running;
        info!(level = index, title = %self.map.title, diamonds = self.diamonds, "level loaded");
        Ok(())
    }

    pub fn restart_level(&mut self) -> GameResult<()> {
        self.load_level(self.level)
    }

    /// Advances to the next level, wrapping to the first after the last.
    pub fn next_level(&mut self) -> GameResult<()> {
        let next = (self.level as usize + 1) % self.archive.len();
        self.load_level(next as u16)
    }

    /// Fresh run from the first level: lives, score and thresholds reset.
    pub fn restart_game(&mut self) -> GameResult<()> {
        self.lives = START_LIVES;
        self.score = 0;
        self.next_life_score = LIFE_BONUS_STEP * (self.skill as u32 + 1);
        self.load_level(0)
    }

    /// Runs one simulation tick against the sampled input. The order of
    /// phases is fixed; rearranging them changes replays.
    pub fn tick(&mut self, input: InputFlags) {
        if self.mode == GameMode::GameOver {
            return;
        }

        self.godmode_ticks = self.godmode_ticks.saturating_sub(1);
        self.speed_ticks = self.speed_ticks.saturating_sub(1);
        if self.timeout_ticks > 0 {
            self.timeout_ticks -= 1;
            if self.timeout_ticks == 0 {
                debug!(level = self.level, "level countdown ran out");
                self.kill_player();
            }
        }
        self.effects.retain_mut(|e| {
            e.ttl = e.ttl.saturating_sub(1);
            e.ttl > 0
        });

        let standing_on = tile::def(self.map.at(self.player.pos));
        if standing_on.health < 0 {
            self.apply_health(standing_on.health);
        }

        let steps = if self.speed_ticks > 0 { 2 } else { 1 };
        for _ in 0..steps {
            self.move_player(input);
        }

        self.dispatch_monsters();
        self.dispatch_bosses();

        if self.health <= 0 {
            self.on_player_death();
        } else if self.diamonds == 0 {
            self.audio.play_sound(sounds::LEVEL_DONE);
            if let Err(e) = self.next_level() {
                warn!(error = %e, "level advance failed; ending game");
                self.mode = GameMode::GameOver;
            }
        }

        self.tick += 1;
    }

    /// Attempts the player move for this tick: the first direction with
    /// active input and a passable destination wins, the rest of the input
    /// is ignored.
    fn move_player(&mut self, input: InputFlags) {
        for dir in Direction::DIRECTIONS {
            if !input.contains(InputFlags::for_direction(dir)) {
                continue;
            }
            if !self.player.can_move(&self.map, &self.keys, dir) {
                continue;
            }
            let dest = self.map.translate(self.player.pos, dir);
            if tile::def(self.map.at(dest)).category == TileCategory::Door {
                self.audio.play_sound(sounds::DOOR);
            }
            self.player.aim = Some(dir);
            self.player.pos = dest;
            self.consume(dest);
            return;
        }
    }

    /// Resolves the tile the player just stepped onto: scoring, healing,
    /// key collection, pickup bonus flags, and the attribute trigger
    /// cascade.
    fn consume(&mut self, pos: TilePoint) {
        let id = self.map.at(pos);
        let def = tile::def(id);
        if matches!(
            def.category,
            TileCategory::Pickup | TileCategory::Diamond | TileCategory::Key
        ) {
            self.add_points(def.score as u32);
            if def.health > 0 {
                self.apply_health(def.health);
            }
            self.map.set(pos, tiles::EMPTY);
            match def.category {
                TileCategory::Diamond => self.diamonds = self.diamonds.saturating_sub(1),
                TileCategory::Key => {
                    self.keys.insert(id);
                }
                _ => {}
            }
            if def.flags.contains(TileFlags::EXTRA_LIFE) {
                self.add_life();
            }
            if def.flags.contains(TileFlags::GODMODE) {
                self.godmode_ticks = GODMODE_DURATION;
            }
            if def.flags.contains(TileFlags::EXTRA_SPEED) {
                self.speed_ticks = EXTRA_SPEED_DURATION;
            }
            self.audio.play_tile_sound(id);
            self.effects.push_back(EffectEvent {
                pos,
                effect: Effect::Sparkle,
                ttl: EFFECT_TTL,
            });
        }

        let group = self.map.attr(pos);
        if group != 0 {
            self.map.set_attr(pos, 0);
            self.trigger_group(group);
        }
    }

    /// Clears every cell sharing an attribute group, decrementing the goal
    /// counter for each diamond among them.
    fn trigger_group(&mut self, group: u8) {
        let targets: Vec<TilePoint> = self
            .map
            .cells()
            .filter(|&cell| self.map.attr(cell) == group)
            .collect();
        debug!(group, cleared = targets.len(), "attribute group triggered");
        for cell in targets {
            if tile::def(self.map.at(cell)).category == TileCategory::Diamond {
                self.diamonds = self.diamonds.saturating_sub(1);
            }
            self.map.set(cell, tiles::EMPTY);
            self.map.set_attr(cell, 0);
        }
    }

    /// Accumulates score; crossing the bonus threshold awards a life and
    /// advances the threshold by a skill-scaled step.
    pub(crate) fn add_points(&mut self, points: u32) {
        self.score += points;
        while self.score >= self.next_life_score {
            self.add_life();
            self.next_life_score += LIFE_BONUS_STEP * (self.skill as u32 + 1);
        }
    }

    pub(crate) fn add_life(&mut self) {
        if self.lives < MAX_LIVES {
            self.lives += 1;
        }
        self.audio.play_sound(sounds::EXTRA_LIFE);
    }

    /// Applies a health delta with skill scaling: healing shrinks and
    /// damage grows with skill, and damage is swallowed entirely while
    /// the godmode timer runs.
    pub(crate) fn apply_health(&mut self, delta: i16) {
        if delta >= 0 {
            let healed = delta as i32 / (1 + self.skill as i32);
            self.health = (self.health + healed).min(self.max_health());
        } else {
            if self.godmode_ticks > 0 {
                return;
            }
            let damage = delta as i32 * (1 + 2 * self.skill as i32);
            self.health = (self.health + damage).max(0);
            self.audio.play_sound(sounds::HURT);
        }
    }

    /// Unconditional kill, godmode aside: used by crushers.
    pub(crate) fn kill_player(&mut self) {
        self.health = 0;
        self.audio.play_sound(sounds::HURT);
    }

    /// Spawns a dynamic actor (projectiles, scripted hazards) onto the
    /// grid. Off-map requests are rejected with a warning; occupied cells
    /// reject quietly.
    pub fn spawn_actor(&mut self, pos: TilePoint, kind: u8, aim: Option<Direction>) -> bool {
        if !self.map.contains(pos) {
            warn!(at = %pos, kind, "actor spawn outside the board; rejected");
            return false;
        }
        if tile::def(self.map.at(pos)).category != TileCategory::Background {
            debug!(at = %pos, kind, "actor spawn cell occupied; rejected");
            return false;
        }
        let mut actor = Actor::new(pos, kind);
        actor.aim = aim;
        actor.under = self.map.at(pos);
        self.map.set(pos, kind);
        self.actors.push(actor);
        true
    }

    /// Damages a boss, handling the death bookkeeping exactly once.
    pub fn damage_boss(&mut self, index: usize, amount: u16) -> bool {
        let Some(boss) = self.bosses.get_mut(index) else {
            return false;
        };
        let died = boss.sustain_damage(amount);
        let score = boss.template().score;
        let pos = boss.tile_cell();
        if died {
            self.add_points(score as u32);
            self.effects.push_back(EffectEvent {
                pos,
                effect: Effect::Collapse,
                ttl: EFFECT_TTL,
            });
            self.audio.play_sound(sounds::BOSS_DIE);
        }
        died
    }

    fn on_player_death(&mut self) {
        if self.lives > 0 {
            self.lives -= 1;
            debug!(lives = self.lives, "player died; restarting level");
            if let Err(e) = self.restart_level() {
                warn!(error = %e, "level restart failed; ending game");
                self.mode = GameMode::GameOver;
            }
        } else {
            info!(score = self.score, "game over");
            self.mode = GameMode::GameOver;
        }
    }

    /// Writes the full save game. Field order and widths are fixed; see
    /// the read side for the layout.
    pub fn save<W: Write>(&self, w: &mut W) -> GameResult<()> {
        bytes::check_bound("save.health", self.health as u32, u16::MAX as u32)?;
        bytes::check_bound("save.diamonds", self.diamonds, u16::MAX as u32)?;
        w.write_all(SAVE_MAGIC).map_err(FormatError::Io)?;
        bytes::write_u32(w, SAVE_VERSION).map_err(FormatError::Io)?;
        bytes::write_u32(w, 0).map_err(FormatError::Io)?; // reserved index pointer
        bytes::write_u16(w, self.lives).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.health as u16).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.level).map_err(FormatError::Io)?;
        bytes::write_u32(w, self.next_life_score).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.diamonds as u16).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.godmode_ticks).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.speed_ticks).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.timeout_ticks).map_err(FormatError::Io)?;
        self.keys.write(w)?;
        bytes::write_u32(w, self.score).map_err(FormatError::Io)?;
        bytes::write_u8(w, self.skill).map_err(FormatError::Io)?;
        self.player.write(w)?;
        self.map.write(w)?;
        bytes::write_u16(w, self.actors.len() as u16).map_err(FormatError::Io)?;
        for actor in &self.actors {
            actor.write(w)?;
        }
        bytes::write_u16(w, self.bosses.len() as u16).map_err(FormatError::Io)?;
        for boss in &self.bosses {
            boss.write(w)?;
        }
        Ok(())
    }

    /// Loads a save written by [`Game::save`]. The load is transactional:
    /// on any error the current game is left exactly as it was.
    pub fn load<R: Read>(&mut self, r: &mut R) -> GameResult<()> {
        let magic = bytes::read_magic(r).map_err(FormatError::Io)?;
        if &magic != SAVE_MAGIC {
            return Err(FormatError::BadMagic {
                expected: "CS3b",
                found: magic,
            }
            .into());
        }
        let version = bytes::read_u32(r).map_err(FormatError::Io)?;
        if version != SAVE_VERSION {
            return Err(FormatError::VersionMismatch {
                expected: SAVE_VERSION,
                found: version,
            }
            .into());
        }
        let _reserved = bytes::read_u32(r).map_err(FormatError::Io)?;
        let lives = bytes::read_u16(r).map_err(FormatError::Io)?;
        let health = bytes::read_u16(r).map_err(FormatError::Io)?;
        let level = bytes::read_u16(r).map_err(FormatError::Io)?;
        let next_life_score = bytes::read_u32(r).map_err(FormatError::Io)?;
        let diamonds = bytes::read_u16(r).map_err(FormatError::Io)?;
        let godmode_ticks = bytes::read_u16(r).map_err(FormatError::Io)?;
        let speed_ticks = bytes::read_u16(r).map_err(FormatError::Io)?;
        let timeout_ticks = bytes::read_u16(r).map_err(FormatError::Io)?;
        let keys = KeyRing::read(r)?;
        let score = bytes::read_u32(r).map_err(FormatError::Io)?;
        let skill = bytes::read_u8(r).map_err(FormatError::Io)?;
        let player = Actor::read(r)?;
        let map = TileMap::read(r)?;
        let actor_count = bytes::read_u16(r).map_err(FormatError::Io)?;
        let mut actors = Vec::with_capacity(actor_count as usize);
        for _ in 0..actor_count {
            actors.push(Actor::read(r)?);
        }
        let boss_count = bytes::read_u16(r).map_err(FormatError::Io)?;
        let mut bosses = Vec::with_capacity(boss_count as usize);
        for _ in 0..boss_count {
            bosses.push(Boss::read(r)?);
        }

        self.lives = lives;
        self.health = health as i32;
        self.level = level;
        self.next_life_score = next_life_score;
        self.diamonds = diamonds as u32;
        self.godmode_ticks = godmode_ticks;
        self.speed_ticks = speed_ticks;
        self.timeout_ticks = timeout_ticks;
        self.keys = keys;
        self.score = score;
        self.skill = skill;
        self.player = player;
        self.map = map;
        self.actors = actors;
        self.bosses = bosses;
        self.mode = GameMode::Running;
        self.effects.clear();
        debug!(level, score, "save game loaded");
        Ok(())
    }
}
