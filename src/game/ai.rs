//! Per-tick AI dispatch: one bespoke policy per monster type, and the
//! boss behavior machine.
//!
//! Mutation during the scans is deferred: new actors (vine spreading,
//! boss projectiles land at the list tail) and removals (detonated
//! projectiles, melted ice cubes) are buffered and merged once the scan
//! is done, so indices stay valid throughout.

use tracing::{debug, warn};

use crate::actor::Actor;
use crate::boss::{Boss, BossState};
use crate::constants::{BOSS_ATTACK_CHANCE, BOSS_GRANULARITY, CHASE_RADIUS, EFFECT_TTL, GIVE_UP_RADIUS, SPEED_CLASSES};
use crate::map::direction::Direction;
use crate::pathfind;
use crate::tile::{self, tiles, TileCategory, TileFlags};

use super::events::{sounds, Effect, EffectEvent};
use super::Game;

impl Game {
    /// Whether an actor of the given speed class acts on the current tick.
    fn acts_this_tick(&self, class: u8) -> bool {
        let modulo = SPEED_CLASSES[class as usize];
        modulo == 0 || self.tick % modulo == 0
    }

    /// Runs every actor's AI for this tick, then applies the buffered
    /// spawns and removals.
    pub(crate) fn dispatch_monsters(&mut self) {
        let mut spawned: Vec<Actor> = Vec::new();
        let mut removed: Vec<usize> = Vec::new();

        for i in 0..self.actors.len() {
            if removed.contains(&i) {
                continue;
            }
            let actor = self.actors[i];
            let def = actor.def();
            let class = if tile::is_crusher(actor.kind) {
                tile::crusher_speed_class(actor.kind)
            } else {
                def.speed
            };
            if !self.acts_this_tick(class) {
                continue;
            }
            match def.category {
                TileCategory::Monster => self.monster_tick(i),
                TileCategory::Drone => self.drone_tick(i),
                TileCategory::VinePlant => self.vine_tick(i, &mut spawned),
                TileCategory::Crusher => self.crusher_tick(i),
                TileCategory::IceCube => self.ice_cube_tick(i),
                TileCategory::Fireball => self.fireball_tick(i, &mut removed),
                TileCategory::Boulder => {}
                other => {
                    warn!(kind = actor.kind, category = other.as_ref(), "unrecognized actor type; skipped this tick");
                }
            }
        }

        removed.sort_unstable();
        removed.dedup();
        for i in removed.into_iter().rev() {
            self.actors.remove(i);
        }
        self.actors.extend(spawned);
    }

    /// Basic patroller: bite the player if directly ahead, then wall-hug.
    fn monster_tick(&mut self, i: usize) {
        let mut actor = self.actors[i];
        let def = actor.def();
        let facing = actor.aim.unwrap_or_default();

        if self.map.translate(actor.pos, facing) == self.player.pos {
            self.apply_health(def.health);
            if def.flags.contains(TileFlags::STICKY) {
                // Stays put while biting.
                self.actors[i] = actor;
                return;
            }
        }

        if let Some(dir) = actor.next_open_direction(&self.map, &self.keys) {
            actor.aim = Some(dir);
            if self.map.translate(actor.pos, dir) == self.player.pos {
                // Bumped into the player instead of displacing them.
                self.apply_health(def.health);
            } else {
                actor.step(&mut self.map, dir);
            }
        }

        if def.flags.contains(TileFlags::ROUND) {
            for dir in Direction::DIRECTIONS {
                if self.map.translate(actor.pos, dir) == self.player.pos {
                    if def.flags.contains(TileFlags::FOCUS) {
                        actor.aim = Some(dir);
                    }
                    break;
                }
            }
        }

        self.actors[i] = actor;
    }

    /// Horizontal-only patroller: reverses on any obstacle, no turn table.
    fn drone_tick(&mut self, i: usize) {
        let mut actor = self.actors[i];
        let def = actor.def();
        let facing = actor.aim.unwrap_or(Direction::Left);

        let ahead = self.map.translate(actor.pos, facing);
        if ahead == self.player.pos {
            self.apply_health(def.health);
            if def.flags.contains(TileFlags::STICKY) {
                self.actors[i] = actor;
                return;
            }
            actor.aim = Some(facing.opposite());
        } else if actor.can_move(&self.map, &self.keys, facing) {
            actor.step(&mut self.map, facing);
        } else {
            actor.aim = Some(facing.opposite());
        }

        self.actors[i] = actor;
    }

    /// Stationary spreader: the first qualifying neighbor wins — bite the
    /// player, grow into swamp, or infect an adjacent monster.
    fn vine_tick(&mut self, i: usize, spawned: &mut Vec<Actor>) {
        let actor = self.actors[i];
        let def = actor.def();

        for dir in Direction::DIRECTIONS {
            let cell = self.map.translate(actor.pos, dir);
            if cell == actor.pos {
                continue;
            }
            if cell == self.player.pos {
                self.apply_health(def.health);
                break;
            }
            match tile::def(self.map.at(cell)).category {
                TileCategory::Swamp => {
                    self.map.set(cell, tiles::VINE);
                    spawned.push(Actor::new(cell, tiles::VINE));
                    debug!(at = %cell, "vine spread into swamp");
                    break;
                }
                TileCategory::Monster | TileCategory::Drone => {
                    if let Some(j) = self.actors.iter().position(|a| a.pos == cell) {
                        self.actors[j].kind = tiles::VINE;
                        self.map.set(cell, tiles::VINE);
                        debug!(at = %cell, "vine infected a neighbor");
                    }
                    break;
                }
                _ => {}
            }
        }
    }

    /// Fixed-axis ram: runs its line until blocked, then reverses. Touching
    /// the player is lethal outside godmode; in godmode the crusher passes
    /// through the player's cell without harm.
    fn crusher_tick(&mut self, i: usize) {
        let mut actor = self.actors[i];
        let facing = actor.aim.unwrap_or(Direction::Left);
        let ahead = self.map.translate(actor.pos, facing);

        if ahead == actor.pos {
            // Board edge.
            actor.aim = Some(facing.opposite());
            self.actors[i] = actor;
            return;
        }

        let open = tile::def(self.map.at(ahead)).category == TileCategory::Background;
        if ahead == self.player.pos {
            if self.godmode_ticks == 0 {
                self.kill_player();
            }
            if open {
                actor.step(&mut self.map, facing);
            } else {
                actor.aim = Some(facing.opposite());
            }
        } else if open {
            actor.step(&mut self.map, facing);
        } else {
            actor.aim = Some(facing.opposite());
        }

        self.actors[i] = actor;
    }

    /// Slides until blocked, then freezes in place for good.
    fn ice_cube_tick(&mut self, i: usize) {
        let mut actor = self.actors[i];
        let Some(facing) = actor.aim else {
            return;
        };
        let ahead = self.map.translate(actor.pos, facing);
        if ahead != self.player.pos && actor.can_move(&self.map, &self.keys, facing) {
            actor.step(&mut self.map, facing);
        } else {
            actor.aim = None;
        }
        self.actors[i] = actor;
    }

    /// Projectile flight: advance along the aim, detonate on the first
    /// obstacle. An ice cube obstacle goes up with it.
    fn fireball_tick(&mut self, i: usize, removed: &mut Vec<usize>) {
        let mut actor = self.actors[i];
        let def = actor.def();
        let facing = actor.aim.unwrap_or(Direction::Right);
        let ahead = self.map.translate(actor.pos, facing);

        if ahead == actor.pos {
            // Flew into the board edge.
            self.detonate(i, &actor, removed);
            return;
        }

        if ahead == self.player.pos {
            if self.godmode_ticks == 0 {
                self.apply_health(def.health);
            }
            self.detonate(i, &actor, removed);
            return;
        }

        let target = self.map.at(ahead);
        if tile::def(target).category == TileCategory::Background {
            actor.step(&mut self.map, facing);
            self.actors[i] = actor;
            return;
        }

        if tile::def(target).category == TileCategory::IceCube {
            // Chained detonation: the cube goes too.
            if let Some(j) = self
                .actors
                .iter()
                .position(|a| a.pos == ahead && a.def().category == TileCategory::IceCube)
            {
                let cube = self.actors[j];
                self.map.set(cube.pos, cube.under);
                removed.push(j);
                self.effects.push_back(EffectEvent {
                    pos: ahead,
                    effect: Effect::Explosion,
                    ttl: EFFECT_TTL,
                });
            }
        }
        self.detonate(i, &actor, removed);
    }

    /// Removes a projectile, restoring the tile it covered and raising
    /// the explosion feedback.
    fn detonate(&mut self, i: usize, actor: &Actor, removed: &mut Vec<usize>) {
        self.map.set(actor.pos, actor.under);
        removed.push(i);
        self.effects.push_back(EffectEvent {
            pos: actor.pos,
            effect: Effect::Explosion,
            ttl: EFFECT_TTL,
        });
        self.audio.play_sound(sounds::EXPLOSION);
    }

    /// Runs every boss's state machine for this tick.
    pub(crate) fn dispatch_bosses(&mut self) {
        let mut removed_actors: Vec<usize> = Vec::new();
        for b in 0..self.bosses.len() {
            let mut boss = self.bosses[b].clone();
            self.boss_tick(&mut boss, &mut removed_actors);
            self.bosses[b] = boss;
        }
        removed_actors.sort_unstable();
        removed_actors.dedup();
        for i in removed_actors.into_iter().rev() {
            self.actors.remove(i);
        }
    }

    fn boss_tick(&mut self, boss: &mut Boss, removed: &mut Vec<usize>) {
        if boss.state() == BossState::Hidden {
            return;
        }

        if boss.state() != BossState::Death {
            let player_pos = self.player.pos;
            if self.godmode_ticks == 0 && boss.hitbox_matches(|cell| cell == player_pos) {
                self.apply_health(boss.template().damage);
            }
            // Anything frozen caught in the hitbox melts.
            for cell in boss.hitbox_cells() {
                if let Some(j) = self
                    .actors
                    .iter()
                    .position(|a| a.pos == cell && a.def().category == TileCategory::IceCube)
                {
                    let cube = self.actors[j];
                    self.map.set(cube.pos, cube.under);
                    removed.push(j);
                    self.effects.push_back(EffectEvent {
                        pos: cell,
                        effect: Effect::Explosion,
                        ttl: EFFECT_TTL,
                    });
                    self.audio.play_sound(sounds::EXPLOSION);
                    break;
                }
            }
        }

        let moves = boss.speed == 0 || self.tick % boss.speed as u64 == 0;

        match boss.state() {
            BossState::Patrol => {
                boss.advance_frame_looping();
                if moves {
                    let dir = self.rng.direction();
                    if boss.can_move(&self.map, dir) {
                        boss.step(dir);
                    }
                }
                if boss.distance_to_tile(self.player.pos) <= CHASE_RADIUS {
                    boss.set_state(BossState::Chase);
                }
            }
            BossState::Chase => {
                boss.advance_frame_looping();
                if boss.distance_to_tile(self.player.pos) > GIVE_UP_RADIUS {
                    boss.path.clear();
                    boss.set_state(BossState::Patrol);
                } else if self.rng.chance(BOSS_ATTACK_CHANCE) {
                    self.spawn_boss_projectile(boss);
                    boss.set_state(BossState::Attack);
                } else if moves {
                    self.chase_step(boss);
                }
            }
            BossState::Attack => {
                if boss.advance_frame() {
                    boss.set_state(BossState::Chase);
                }
            }
            BossState::Hurt => {
                if boss.advance_frame() {
                    boss.set_state(BossState::Patrol);
                }
            }
            BossState::Flee => {
                if moves {
                    self.flee_step(boss);
                }
                if boss.advance_frame() {
                    boss.set_state(BossState::Patrol);
                }
            }
            BossState::Death => {
                if boss.advance_frame() {
                    boss.set_state(BossState::Hidden);
                }
            }
            BossState::Hidden => {}
        }
    }

    /// One pursuit step: follow the computed path, recomputing when the
    /// player has moved, and fall back to greedy axis-priority movement
    /// when the search finds nothing.
    fn chase_step(&mut self, boss: &mut Boss) {
        let goal = self.player.pos * BOSS_GRANULARITY;
        if boss.path.steps.is_empty() || boss.path.goal != goal {
            let bounds = self.map.size() * BOSS_GRANULARITY;
            let map = &self.map;
            let probe: &Boss = boss;
            let steps = pathfind::find_path(probe.pos, goal, bounds, |from, dir| probe.can_enter(map, from, dir));
            boss.path.goal = goal;
            boss.path.steps = steps.into();
        }

        if let Some(dir) = boss.path.steps.pop_front() {
            if boss.can_move(&self.map, dir) {
                boss.step(dir);
                return;
            }
            // Terrain changed under the path; drop it and fall through.
            boss.path.steps.clear();
        }

        let delta = goal - boss.pos;
        let horizontal = match delta.x {
            x if x > 0 => Some(Direction::Right),
            x if x < 0 => Some(Direction::Left),
            _ => None,
        };
        let vertical = match delta.y {
            y if y > 0 => Some(Direction::Down),
            y if y < 0 => Some(Direction::Up),
            _ => None,
        };
        for dir in [horizontal, vertical].into_iter().flatten() {
            if boss.can_move(&self.map, dir) {
                boss.step(dir);
                return;
            }
        }
    }

    /// One retreat step, directly away from the player.
    fn flee_step(&mut self, boss: &mut Boss) {
        let delta = boss.pos - self.player.pos * BOSS_GRANULARITY;
        let away = [
            match delta.x {
                x if x >= 0 => Some(Direction::Right),
                _ => Some(Direction::Left),
            },
            match delta.y {
                y if y >= 0 => Some(Direction::Down),
                _ => Some(Direction::Up),
            },
        ];
        for dir in away.into_iter().flatten() {
            if boss.can_move(&self.map, dir) {
                boss.step(dir);
                return;
            }
        }
    }

    /// Launches a projectile toward the player from the cell next to the
    /// boss. Off-map or occupied spawn cells reject the launch.
    fn spawn_boss_projectile(&mut self, boss: &Boss) {
        let rel = self.player.pos - boss.tile_cell();
        let dir = if rel.x.abs() >= rel.y.abs() {
            if rel.x >= 0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if rel.y > 0 {
            Direction::Down
        } else {
            Direction::Up
        };

        let cell = boss.tile_cell() + dir.offset();
        self.spawn_actor(cell, tiles::FIREBALL, Some(dir));
    }
}
