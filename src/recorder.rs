//! Run-length-encoded capture and playback of per-tick input state.
//!
//! Used for demo recording and regression testing: together with a fixed
//! RNG seed, a recording replays a run tick-for-tick.

use std::io::{Read, Seek, SeekFrom, Write};

use bitflags::bitflags;

use crate::bytes;
use crate::constants::{RECORDING_MAGIC, RECORDING_VERSION};
use crate::error::{FormatError, GameResult};
use crate::map::direction::Direction;

bitflags! {
    /// The four digital inputs sampled each tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputFlags: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl InputFlags {
    /// The flag corresponding to a direction.
    pub fn for_direction(dir: Direction) -> InputFlags {
        match dir {
            Direction::Up => InputFlags::UP,
            Direction::Down => InputFlags::DOWN,
            Direction::Left => InputFlags::LEFT,
            Direction::Right => InputFlags::RIGHT,
        }
    }
}

/// Longest run one packed byte can carry.
const MAX_RUN: u32 = 15;

/// A recorded stream of per-tick input states, stored as (state, length)
/// runs. Adjacent equal states always share a run, so two recordings of
/// the same tick sequence compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputRecorder {
    runs: Vec<(InputFlags, u32)>,
}

impl InputRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one tick of input.
    pub fn record(&mut self, input: InputFlags) {
        if let Some((state, count)) = self.runs.last_mut() {
            if *state == input {
                *count += 1;
                return;
            }
        }
        self.runs.push((input, 1));
    }

    /// Total recorded ticks.
    pub fn len(&self) -> usize {
        self.runs.iter().map(|(_, count)| *count as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Iterates the recording tick-by-tick, expanding runs.
    pub fn replay(&self) -> impl Iterator<Item = InputFlags> + '_ {
        self.runs
            .iter()
            .flat_map(|(state, count)| std::iter::repeat_n(*state, *count as usize))
    }

    /// Writes the stream: magic, version, payload size, packed runs. Each
    /// payload byte packs a repeat count (high nibble, 1..=15) and the
    /// input-state nibble (low); runs longer than 15 ticks span several
    /// bytes. The size field is written last by seeking back over the
    /// header once the payload length is known.
    pub fn write<W: Write + Seek>(&self, w: &mut W) -> GameResult<()> {
        w.write_all(RECORDING_MAGIC).map_err(FormatError::Io)?;
        bytes::write_u32(w, RECORDING_VERSION).map_err(FormatError::Io)?;
        let size_field = w.stream_position().map_err(FormatError::Io)?;
        bytes::write_u32(w, 0).map_err(FormatError::Io)?;

        let mut payload = 0u32;
        for (state, count) in &self.runs {
            let mut remaining = *count;
            while remaining > 0 {
                let chunk = remaining.min(MAX_RUN);
                let packed = ((chunk as u8) << 4) | state.bits();
                bytes::write_u8(w, packed).map_err(FormatError::Io)?;
                payload += 1;
                remaining -= chunk;
            }
        }

        let end = w.stream_position().map_err(FormatError::Io)?;
        w.seek(SeekFrom::Start(size_field)).map_err(FormatError::Io)?;
        bytes::write_u32(w, payload).map_err(FormatError::Io)?;
        w.seek(SeekFrom::Start(end)).map_err(FormatError::Io)?;
        Ok(())
    }

    /// Reads a stream written by [`InputRecorder::write`]. Split runs are
    /// merged back together, so a round trip reproduces the original.
    pub fn read<R: Read>(r: &mut R) -> GameResult<Self> {
        let magic = bytes::read_magic(r).map_err(FormatError::Io)?;
        if &magic != RECORDING_MAGIC {
            return Err(FormatError::BadMagic {
                expected: "REC!",
                found: magic,
            }
            .into());
        }
        let version = bytes::read_u32(r).map_err(FormatError::Io)?;
        if version != RECORDING_VERSION {
            return Err(FormatError::VersionMismatch {
                expected: RECORDING_VERSION,
                found: version,
            }
            .into());
        }
        let payload = bytes::read_u32(r).map_err(FormatError::Io)?;

        let mut recorder = InputRecorder::new();
        for _ in 0..payload {
            let packed = bytes::read_u8(r).map_err(FormatError::Io)?;
            let count = (packed >> 4) as u32;
            let state = InputFlags::from_bits_truncate(packed & 0x0F);
            if count == 0 {
                return Err(FormatError::ValueOutOfRange {
                    field: "recording.run",
                    value: 0,
                    limit: 1,
                }
                .into());
            }
            match recorder.runs.last_mut() {
                Some((last, total)) if *last == state => *total += count,
                _ => recorder.runs.push((state, count)),
            }
        }
        Ok(recorder)
    }
}
