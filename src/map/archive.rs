//! Indexed collection of level maps with an offset-table binary format.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::bytes;
use crate::constants::{ARCHIVE_MAGIC, ARCHIVE_VERSION};
use crate::error::{FormatError, GameResult, MapError};
use crate::map::TileMap;

/// Header bytes before the offset index: magic + version + count + index
/// offset.
const HEADER_LEN: u32 = 4 + 2 + 2 + 4;

/// An ordered collection of owned [`TileMap`]s, one per level.
///
/// The simulation copies maps out of the archive on level load; mutating
/// the live level never touches the archived original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapArchive {
    maps: Vec<TileMap>,
}

impl MapArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TileMap> {
        self.maps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TileMap> {
        self.maps.get_mut(index)
    }

    pub fn push(&mut self, map: TileMap) {
        self.maps.push(map);
    }

    pub fn insert(&mut self, index: usize, map: TileMap) -> GameResult<()> {
        if index > self.maps.len() {
            return Err(MapError::IndexOutOfRange {
                index,
                len: self.maps.len(),
            }
            .into());
        }
        self.maps.insert(index, map);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> GameResult<TileMap> {
        if index >= self.maps.len() {
            return Err(MapError::IndexOutOfRange {
                index,
                len: self.maps.len(),
            }
            .into());
        }
        Ok(self.maps.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileMap> {
        self.maps.iter()
    }

    /// Writes the archive: header, offset index, then one map blob per
    /// level. Offsets are absolute file positions, computed up front so a
    /// plain `Write` sink suffices.
    pub fn write<W: Write>(&self, w: &mut W) -> GameResult<()> {
        let blobs: Vec<Vec<u8>> = self
            .maps
            .iter()
            .map(|map| {
                let mut buf = Vec::new();
                map.write(&mut buf).map(|_| buf)
            })
            .collect::<GameResult<_>>()?;

        w.write_all(ARCHIVE_MAGIC).map_err(FormatError::Io)?;
        bytes::write_u16(w, ARCHIVE_VERSION).map_err(FormatError::Io)?;
        bytes::write_u16(w, blobs.len() as u16).map_err(FormatError::Io)?;
        bytes::write_u32(w, HEADER_LEN).map_err(FormatError::Io)?;

        let mut offset = HEADER_LEN + 4 * blobs.len() as u32;
        for blob in &blobs {
            bytes::write_u32(w, offset).map_err(FormatError::Io)?;
            offset += blob.len() as u32;
        }
        for blob in &blobs {
            w.write_all(blob).map_err(FormatError::Io)?;
        }
        Ok(())
    }

    /// Reads an archive written by [`MapArchive::write`]. The whole load is
    /// transactional: any failure yields an error and no archive.
    pub fn read<R: Read + Seek>(r: &mut R) -> GameResult<Self> {
        let magic = bytes::read_magic(r).map_err(FormatError::Io)?;
        if &magic != ARCHIVE_MAGIC {
            return Err(FormatError::BadMagic {
                expected: "MAAZ",
                found: magic,
            }
            .into());
        }
        let version = bytes::read_u16(r).map_err(FormatError::Io)?;
        if version != ARCHIVE_VERSION {
            return Err(FormatError::VersionMismatch {
                expected: ARCHIVE_VERSION as u32,
                found: version as u32,
            }
            .into());
        }
        let count = bytes::read_u16(r).map_err(FormatError::Io)?;
        let index_offset = bytes::read_u32(r).map_err(FormatError::Io)?;

        r.seek(SeekFrom::Start(index_offset as u64)).map_err(FormatError::Io)?;
        let mut offsets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            offsets.push(bytes::read_u32(r).map_err(FormatError::Io)?);
        }

        let mut maps = Vec::with_capacity(count as usize);
        for offset in offsets {
            r.seek(SeekFrom::Start(offset as u64)).map_err(FormatError::Io)?;
            maps.push(TileMap::read(r)?);
        }
        debug!(count = maps.len(), "loaded map archive");
        Ok(Self { maps })
    }
}
