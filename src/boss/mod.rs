//! Boss entities: shared static templates, the per-boss state machine,
//! hitbox testing and the bound-checked serial format.
//!
//! Bosses live at twice the tile-grid resolution (the granularity factor)
//! and do not ride the tile grid the way ordinary actors do; their
//! collision shape is the hitbox rectangle set from their template.

use std::collections::VecDeque;
use std::io::{Read, Write};

use smallvec::SmallVec;
use strum::EnumCount;
use strum_macros::{AsRefStr, EnumCount as EnumCountMacro, FromRepr};
use tracing::trace;

use crate::bytes;
use crate::constants::{
    BOSS_GRANULARITY, BOSS_MAX_FRAME, BOSS_MAX_HP, BOSS_MAX_PATH, BOSS_MAX_POS, BOSS_MAX_SPEED,
};
use crate::error::{FormatError, GameResult};
use crate::map::direction::Direction;
use crate::map::{TileMap, TilePoint};
use crate::tile::{self, tiles, TileCategory};

/// States of the boss behavior machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumCountMacro, FromRepr)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum BossState {
    Patrol,
    Chase,
    Attack,
    Hurt,
    Death,
    /// Terminal until level reset.
    Hidden,
    Flee,
}

/// Axis-aligned rectangle in sub-tile units, offset-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRect {
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
}

impl HitRect {
    pub const fn new(x: i16, y: i16, width: i16, height: i16) -> Self {
        Self { x, y, width, height }
    }
}

/// Which terrain blocks a boss. Selected once at construction from the
/// boss kind and used by both movement and pathfinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Anything that is not open floor is solid.
    Solid,
    /// Blocked only by swamp, ice and plain wall; phases through the rest.
    Marsh,
}

impl CollisionPolicy {
    pub fn blocks(self, tile_id: u8) -> bool {
        let category = tile::def(tile_id).category;
        match self {
            CollisionPolicy::Solid => {
                !matches!(category, TileCategory::Background | TileCategory::Player)
            }
            CollisionPolicy::Marsh => {
                matches!(category, TileCategory::Swamp | TileCategory::IceCube) || tile_id == tiles::WALL
            }
        }
    }
}

/// Shared, never-mutated definition of a boss kind.
#[derive(Debug, PartialEq, Eq)]
pub struct BossTemplate {
    /// Tile id that spawns this boss; also the serialized kind byte.
    pub kind: u8,
    pub name: &'static str,
    /// Unscaled hit points; the effective maximum is skill-scaled.
    pub base_hp: u16,
    /// Health delta applied to the player on hitbox contact.
    pub damage: i16,
    /// Points awarded when the boss dies.
    pub score: u16,
    pub base_speed: u16,
    pub policy: CollisionPolicy,
    /// Primary hitbox, relative to the boss position.
    pub hitbox: HitRect,
    /// Sprite-sheet frame sequence per state, indexed by `BossState`.
    pub frames: [&'static [u16]; BossState::COUNT],
    /// Extra hitboxes active on specific sheet frames, positioned relative
    /// to the primary hitbox origin.
    pub frame_boxes: &'static [(u16, HitRect)],
}

pub static TEMPLATES: [BossTemplate; 2] = [
    BossTemplate {
        kind: tiles::OGRE,
        name: "Ogre",
        base_hp: 60,
        damage: -20,
        score: 2000,
        base_speed: 2,
        policy: CollisionPolicy::Solid,
        hitbox: HitRect::new(0, 0, 2, 2),
        frames: [
            &[0, 1, 2, 3],     // patrol
            &[4, 5, 6, 7],     // chase
            &[8, 9, 10, 11],   // attack
            &[12, 13],         // hurt
            &[14, 15, 16, 17], // death
            &[18],             // hidden
            &[4, 5, 6, 7],     // flee
        ],
        // The attack swing reaches one tile ahead of the body.
        frame_boxes: &[
            (10, HitRect::new(2, 0, 2, 2)),
            (11, HitRect::new(2, 0, 2, 2)),
        ],
    },
    BossTemplate {
        kind: tiles::WRAITH,
        name: "Wraith",
        base_hp: 40,
        damage: -12,
        score: 3500,
        base_speed: 1,
        policy: CollisionPolicy::Marsh,
        hitbox: HitRect::new(0, 0, 2, 2),
        frames: [
            &[0, 1, 2, 1],  // patrol
            &[3, 4, 5, 4],  // chase
            &[6, 7, 8],     // attack
            &[9, 10],       // hurt
            &[11, 12, 13],  // death
            &[14],          // hidden
            &[3, 4, 5, 4],  // flee
        ],
        frame_boxes: &[],
    },
];

/// Template for a boss kind byte, if the kind is known.
pub fn template(kind: u8) -> Option<&'static BossTemplate> {
    TEMPLATES.iter().find(|t| t.kind == kind)
}

/// Skill-scaled maximum: `base * (skill * 0.5 + 1)` in integer math.
pub fn scale_by_skill(base: u16, skill: u8) -> u16 {
    base + base * skill as u16 / 2
}

/// Pursuit bookkeeping carried between ticks: the goal the current path
/// was computed for and the steps not yet walked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathState {
    pub goal: TilePoint,
    pub steps: VecDeque<Direction>,
}

impl PathState {
    pub fn clear(&mut self) {
        self.goal = TilePoint::ZERO;
        self.steps.clear();
    }

    fn write<W: Write>(&self, w: &mut W) -> GameResult<()> {
        bytes::check_bound("path.goal.x", self.goal.x as u32, BOSS_MAX_POS as u32)?;
        bytes::check_bound("path.goal.y", self.goal.y as u32, BOSS_MAX_POS as u32)?;
        bytes::check_bound("path.len", self.steps.len() as u32, BOSS_MAX_PATH as u32 + 1)?;
        bytes::write_u16(w, self.goal.x as u16).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.goal.y as u16).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.steps.len() as u16).map_err(FormatError::Io)?;
        for dir in &self.steps {
            bytes::write_u8(w, dir.as_usize() as u8).map_err(FormatError::Io)?;
        }
        Ok(())
    }

    fn read<R: Read>(r: &mut R) -> GameResult<Self> {
        let gx = bytes::read_u16(r).map_err(FormatError::Io)?;
        let gy = bytes::read_u16(r).map_err(FormatError::Io)?;
        bytes::check_bound("path.goal.x", gx as u32, BOSS_MAX_POS as u32)?;
        bytes::check_bound("path.goal.y", gy as u32, BOSS_MAX_POS as u32)?;
        let count = bytes::read_u16(r).map_err(FormatError::Io)?;
        bytes::check_bound("path.len", count as u32, BOSS_MAX_PATH as u32 + 1)?;
        let mut steps = VecDeque::with_capacity(count as usize);
        for _ in 0..count {
            let code = bytes::read_u8(r).map_err(FormatError::Io)?;
            let dir = Direction::from_byte(code).ok_or(FormatError::UnknownDirection(code))?;
            steps.push_back(dir);
        }
        Ok(Self {
            goal: TilePoint::new(gx as i16, gy as i16),
            steps,
        })
    }
}

/// A live boss. Position is in sub-tile coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Boss {
    pub pos: TilePoint,
    template: &'static BossTemplate,
    pub hp: u16,
    pub speed: u16,
    frame: u16,
    state: BossState,
    pub aim: Direction,
    pub path: PathState,
}

impl Boss {
    /// Spawns a boss of the given kind at a sub-tile position, with hit
    /// points scaled for the current skill level.
    pub fn new(kind: u8, pos: TilePoint, skill: u8) -> Option<Self> {
        let template = template(kind)?;
        Some(Self {
            pos,
            template,
            hp: scale_by_skill(template.base_hp, skill),
            speed: template.base_speed,
            frame: 0,
            state: BossState::Patrol,
            aim: Direction::Left,
            path: PathState::default(),
        })
    }

    pub fn template(&self) -> &'static BossTemplate {
        self.template
    }

    pub fn kind(&self) -> u8 {
        self.template.kind
    }

    pub fn name(&self) -> &'static str {
        self.template.name
    }

    pub fn state(&self) -> BossState {
        self.state
    }

    pub fn frame(&self) -> u16 {
        self.frame
    }

    pub fn max_hp(&self, skill: u8) -> u16 {
        scale_by_skill(self.template.base_hp, skill)
    }

    /// Switches state and rewinds the animation to the first frame.
    pub fn set_state(&mut self, state: BossState) {
        if self.state != state {
            trace!(boss = self.name(), from = self.state.as_ref(), to = state.as_ref(), "boss state change");
        }
        self.state = state;
        self.frame = 0;
    }

    /// Applies damage, clamping at zero. Entering `Death` is reported
    /// exactly once; any further hits at zero hit points are swallowed.
    pub fn sustain_damage(&mut self, amount: u16) -> bool {
        self.hp = self.hp.saturating_sub(amount);
        if self.hp == 0 {
            if !matches!(self.state, BossState::Death | BossState::Hidden) {
                self.set_state(BossState::Death);
                return true;
            }
            return false;
        }
        self.set_state(BossState::Hurt);
        false
    }

    /// Animation frame sequence for the current state.
    pub fn sequence(&self) -> &'static [u16] {
        self.template.frames[self.state as usize]
    }

    /// Sprite-sheet frame currently displayed.
    pub fn sheet_frame(&self) -> u16 {
        let seq = self.sequence();
        if seq.is_empty() {
            return 0;
        }
        seq[self.frame as usize % seq.len()]
    }

    /// Advances the animation one frame. Returns true when the sequence
    /// has completed; the frame then holds at the last index until the
    /// next state change rewinds it.
    pub fn advance_frame(&mut self) -> bool {
        let len = self.sequence().len() as u16;
        if len == 0 || self.frame + 1 >= len {
            return true;
        }
        self.frame += 1;
        false
    }

    /// Frame advance for the looping states (patrol, chase): wraps back
    /// to the first frame instead of completing.
    pub fn advance_frame_looping(&mut self) {
        let len = self.sequence().len() as u16;
        if len > 0 {
            self.frame = (self.frame + 1) % len;
        }
    }

    /// The tile-grid cell the boss's origin occupies.
    pub fn tile_cell(&self) -> TilePoint {
        TilePoint::new(
            self.pos.x.div_euclid(BOSS_GRANULARITY),
            self.pos.y.div_euclid(BOSS_GRANULARITY),
        )
    }

    /// Whether the boss could advance one sub-tile step in `dir`,
    /// according to its collision policy.
    pub fn can_move(&self, map: &TileMap, dir: Direction) -> bool {
        self.can_enter(map, self.pos, dir)
    }

    /// The same test for a hypothetical position; this is what the
    /// pathfinder calls, so the boss itself is never perturbed mid-search.
    pub fn can_enter(&self, map: &TileMap, from: TilePoint, dir: Direction) -> bool {
        let dest = from + dir.offset();
        let limit = map.size() * BOSS_GRANULARITY;
        if dest.x < 0 || dest.y < 0 || dest.x >= limit.x || dest.y >= limit.y {
            return false;
        }
        let cell = TilePoint::new(dest.x.div_euclid(BOSS_GRANULARITY), dest.y.div_euclid(BOSS_GRANULARITY));
        !self.template.policy.blocks(map.at(cell))
    }

    /// Moves one sub-tile step and faces that way. Callers validate first.
    pub fn step(&mut self, dir: Direction) {
        self.pos += dir.offset();
        self.aim = dir;
    }

    /// Euclidean distance to a tile-grid position, in sub-tile units.
    pub fn distance_to_tile(&self, tile_pos: TilePoint) -> f32 {
        let target = tile_pos * BOSS_GRANULARITY;
        let dx = (target.x - self.pos.x) as f32;
        let dy = (target.y - self.pos.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Tile cells covered by the primary hitbox plus any secondary boxes
    /// active on the current sheet frame.
    pub fn hitbox_cells(&self) -> SmallVec<[TilePoint; 8]> {
        let mut cells: SmallVec<[TilePoint; 8]> = SmallVec::new();
        let add_rect = |cells: &mut SmallVec<[TilePoint; 8]>, origin: TilePoint, r: &HitRect| {
            if r.width <= 0 || r.height <= 0 {
                return;
            }
            let x0 = (origin.x + r.x).div_euclid(BOSS_GRANULARITY);
            let y0 = (origin.y + r.y).div_euclid(BOSS_GRANULARITY);
            let x1 = (origin.x + r.x + r.width - 1).div_euclid(BOSS_GRANULARITY);
            let y1 = (origin.y + r.y + r.height - 1).div_euclid(BOSS_GRANULARITY);
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let cell = TilePoint::new(x, y);
                    if !cells.contains(&cell) {
                        cells.push(cell);
                    }
                }
            }
        };
        add_rect(&mut cells, self.pos, &self.template.hitbox);
        let primary_origin = self.pos + TilePoint::new(self.template.hitbox.x, self.template.hitbox.y);
        let sheet = self.sheet_frame();
        for (frame, rect) in self.template.frame_boxes {
            if *frame == sheet {
                add_rect(&mut cells, primary_origin, rect);
            }
        }
        cells
    }

    /// Runs `test` over every covered cell; on the first hit, invokes
    /// `action` with that cell and stops. Returns whether anything hit.
    pub fn test_hitbox<T, A>(&self, test: T, mut action: A) -> bool
    where
        T: Fn(TilePoint) -> bool,
        A: FnMut(TilePoint),
    {
        for cell in self.hitbox_cells() {
            if test(cell) {
                action(cell);
                return true;
            }
        }
        false
    }

    /// Hitbox test without an action: true if any covered cell matches.
    pub fn hitbox_matches<T>(&self, test: T) -> bool
    where
        T: Fn(TilePoint) -> bool,
    {
        self.test_hitbox(test, |_| {})
    }

    /// Serial layout: kind, frame, x, y, hp, state, speed, aim, then the
    /// nested path state. Every field is checked against its sanity bound
    /// on both sides; a violation fails the whole record.
    pub fn write<W: Write>(&self, w: &mut W) -> GameResult<()> {
        bytes::check_bound("boss.frame", self.frame as u32, BOSS_MAX_FRAME as u32)?;
        bytes::check_bound("boss.x", self.pos.x as u32, BOSS_MAX_POS as u32)?;
        bytes::check_bound("boss.y", self.pos.y as u32, BOSS_MAX_POS as u32)?;
        bytes::check_bound("boss.hp", self.hp as u32, BOSS_MAX_HP as u32)?;
        bytes::check_bound("boss.speed", self.speed as u32, BOSS_MAX_SPEED as u32)?;
        bytes::write_u8(w, self.template.kind).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.frame).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.pos.x as u16).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.pos.y as u16).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.hp).map_err(FormatError::Io)?;
        bytes::write_u8(w, self.state as u8).map_err(FormatError::Io)?;
        bytes::write_u16(w, self.speed).map_err(FormatError::Io)?;
        bytes::write_u8(w, self.aim.as_usize() as u8).map_err(FormatError::Io)?;
        self.path.write(w)
    }

    pub fn read<R: Read>(r: &mut R) -> GameResult<Self> {
        let kind = bytes::read_u8(r).map_err(FormatError::Io)?;
        let template = template(kind).ok_or(FormatError::UnknownBossKind(kind))?;
        let frame = bytes::read_u16(r).map_err(FormatError::Io)?;
        bytes::check_bound("boss.frame", frame as u32, BOSS_MAX_FRAME as u32)?;
        let x = bytes::read_u16(r).map_err(FormatError::Io)?;
        bytes::check_bound("boss.x", x as u32, BOSS_MAX_POS as u32)?;
        let y = bytes::read_u16(r).map_err(FormatError::Io)?;
        bytes::check_bound("boss.y", y as u32, BOSS_MAX_POS as u32)?;
        let hp = bytes::read_u16(r).map_err(FormatError::Io)?;
        bytes::check_bound("boss.hp", hp as u32, BOSS_MAX_HP as u32)?;
        let state_byte = bytes::read_u8(r).map_err(FormatError::Io)?;
        let state = BossState::from_repr(state_byte).ok_or(FormatError::ValueOutOfRange {
            field: "boss.state",
            value: state_byte as u32,
            limit: BossState::COUNT as u32,
        })?;
        let speed = bytes::read_u16(r).map_err(FormatError::Io)?;
        bytes::check_bound("boss.speed", speed as u32, BOSS_MAX_SPEED as u32)?;
        let aim_byte = bytes::read_u8(r).map_err(FormatError::Io)?;
        let aim = Direction::from_byte(aim_byte).ok_or(FormatError::UnknownDirection(aim_byte))?;
        let path = PathState::read(r)?;
        Ok(Self {
            pos: TilePoint::new(x as i16, y as i16),
            template,
            hp,
            speed,
            frame,
            state,
            aim,
            path,
        })
    }
}
