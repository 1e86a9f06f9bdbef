//! Simulation core for a 2D tile-based action-adventure game.
//!
//! The crate owns the tile map model, actor movement and collision, the
//! per-type monster AI, the boss state machine with A*-based pursuit, and
//! the binary formats for maps, map archives, save games and input
//! recordings. Rendering, audio playback, windowing and asset loading are
//! collaborators behind narrow boundaries ([`game::events::AudioSink`],
//! the read accessors on [`game::Game`]); nothing here blocks or spawns
//! threads, and a run is fully determined by the level data, the RNG seed
//! and the per-tick input stream.

pub mod actor;
pub mod boss;
pub mod bytes;
pub mod constants;
pub mod error;
pub mod game;
pub mod map;
pub mod pathfind;
pub mod recorder;
pub mod rng;
pub mod tile;
