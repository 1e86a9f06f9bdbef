//! Centralized error types for the simulation core.
//!
//! This module defines all error types used throughout the crate,
//! providing a consistent error handling approach. "Not found",
//! "blocked" and "no path" are ordinary return values elsewhere;
//! only genuine failures (bad file formats, impossible requests)
//! surface through these types.

use std::io;
use std::string::FromUtf8Error;

/// Main error type for the simulation core.
///
/// This is the primary error type that should be used in public APIs.
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Errors related to map content and addressing.
#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error("Cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds { x: i16, y: i16, width: u16, height: u16 },

    #[error("Archive index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Map has no player spawn tile")]
    NoPlayerSpawn,

    #[error("Invalid map dimensions {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },
}

/// Errors raised while reading or writing one of the binary formats.
///
/// Any bound violation is a hard read failure: a record carrying an
/// out-of-range field never produces a partially valid value.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("Bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: &'static str, found: [u8; 4] },

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Field {field} out of range: {value} (limit {limit})")]
    ValueOutOfRange {
        field: &'static str,
        value: u32,
        limit: u32,
    },

    #[error("Unknown boss kind: {0:#04x}")]
    UnknownBossKind(u8),

    #[error("Unknown direction code: {0}")]
    UnknownDirection(u8),

    #[error("Unknown layer kind: {0}")]
    UnknownLayerKind(u8),

    #[error("Unknown state value tag: {0}")]
    UnknownStateTag(u8),

    #[error("Invalid string payload: {0}")]
    BadString(#[from] FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for simulation operations.
pub type GameResult<T> = Result<T, GameError>;
