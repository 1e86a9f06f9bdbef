//! Outward-facing event surface: transient visual effects for the
//! renderer and the fire-and-forget audio boundary.

use crate::map::TilePoint;

/// Visual effect kinds the simulation can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// A projectile or ice cube went up.
    Explosion,
    /// Pickup collected.
    Sparkle,
    /// Boss defeated.
    Collapse,
}

/// One transient effect for the renderer: where, what, and how many ticks
/// it stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectEvent {
    pub pos: TilePoint,
    pub effect: Effect,
    pub ttl: u16,
}

/// Sound ids handed to the audio sink.
pub mod sounds {
    pub const PICKUP: u16 = 1;
    pub const DOOR: u16 = 2;
    pub const HURT: u16 = 3;
    pub const EXPLOSION: u16 = 4;
    pub const EXTRA_LIFE: u16 = 5;
    pub const BOSS_DIE: u16 = 6;
    pub const LEVEL_DONE: u16 = 7;
}

/// The audio collaborator boundary. Calls are fire-and-forget; the
/// simulation never consumes a return value.
pub trait AudioSink {
    fn play_sound(&mut self, id: u16);
    /// Sound keyed by the tile that caused it (pickup chimes, door creaks).
    fn play_tile_sound(&mut self, tile: u8);
}

/// Default sink that swallows everything; used until the runtime installs
/// a real one.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_sound(&mut self, _id: u16) {}
    fn play_tile_sound(&mut self, _tile: u8) {}
}
