//! Little-endian primitive framing for the binary formats.
//!
//! Every persisted format in this crate is a fixed little-endian field
//! layout, so the readers and writers below are the only place byte order
//! appears. Strings are length-prefixed (u16) UTF-8.

use std::io::{Read, Write};

use crate::error::FormatError;

pub fn read_u8<R: Read>(r: &mut R) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16<R: Read>(r: &mut R) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_i16<R: Read>(r: &mut R) -> std::io::Result<i16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

pub fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_magic<R: Read>(r: &mut R) -> std::io::Result<[u8; 4]> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_vec<R: Read>(r: &mut R, len: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_string<R: Read>(r: &mut R) -> Result<String, FormatError> {
    let len = read_u16(r)? as usize;
    let bytes = read_vec(r, len)?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_u8<W: Write>(w: &mut W, value: u8) -> std::io::Result<()> {
    w.write_all(&[value])
}

pub fn write_u16<W: Write>(w: &mut W, value: u16) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_i16<W: Write>(w: &mut W, value: i16) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_u32<W: Write>(w: &mut W, value: u32) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

/// Writes a u16 length prefix followed by the UTF-8 bytes. Titles and hint
/// strings are far below the u16 limit; longer input is truncated at a
/// character boundary rather than rejected.
pub fn write_string<W: Write>(w: &mut W, value: &str) -> std::io::Result<()> {
    let mut bytes = value.as_bytes();
    if bytes.len() > u16::MAX as usize {
        let mut end = u16::MAX as usize;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        bytes = &value.as_bytes()[..end];
    }
    write_u16(w, bytes.len() as u16)?;
    w.write_all(bytes)
}

/// Checks a just-read value against an exclusive sanity bound.
pub fn check_bound(field: &'static str, value: u32, limit: u32) -> Result<(), FormatError> {
    if value >= limit {
        tracing::warn!(field, value, limit, "serialized field out of range");
        return Err(FormatError::ValueOutOfRange { field, value, limit });
    }
    Ok(())
}
