//! Primitive wire codecs.
//!
//! The server address wire format is built from two primitives shared with
//! JVM `DataOutput` peers:
//!
//! - a string as `[len: u16 BE][modified UTF-8 bytes]`
//! - an `i32` in big-endian order
//!
//! Modified UTF-8 differs from standard UTF-8 in two places: NUL is written as
//! the two-byte sequence `C0 80`, and characters outside the BMP are written as
//! a UTF-16 surrogate pair, each half as a three-byte sequence.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Largest encoded string body the `u16` length prefix can describe.
pub const MAX_UTF_LEN: usize = u16::MAX as usize;

/// Number of bytes `s` occupies in modified UTF-8, excluding the length prefix.
pub fn modified_utf8_len(s: &str) -> usize {
    s.encode_utf16().map(unit_len).sum()
}

#[inline]
fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

/// Writes `s` as a length-prefixed modified UTF-8 string.
///
/// Fails with an `InvalidData` i/o error when the encoding exceeds
/// [`MAX_UTF_LEN`] bytes; nothing is written in that case.
pub fn put_modified_utf8<B: BufMut>(buf: &mut B, s: &str) -> Result<()> {
    let len = modified_utf8_len(s);
    if len > MAX_UTF_LEN {
        return Err(Error::invalid_data(format!(
            "encoded string too long: {len} bytes"
        )));
    }

    buf.put_u16(len as u16);
    for unit in s.encode_utf16() {
        match unit_len(unit) {
            1 => buf.put_u8(unit as u8),
            2 => {
                buf.put_u8(0xC0 | ((unit >> 6) & 0x1F) as u8);
                buf.put_u8(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                buf.put_u8(0xE0 | ((unit >> 12) & 0x0F) as u8);
                buf.put_u8(0x80 | ((unit >> 6) & 0x3F) as u8);
                buf.put_u8(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    Ok(())
}

/// Reads a length-prefixed modified UTF-8 string.
pub fn get_modified_utf8<B: Buf>(buf: &mut B) -> Result<String> {
    if buf.remaining() < 2 {
        return Err(Error::eof("string length"));
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(Error::eof("string body"));
    }
    let body = buf.copy_to_bytes(len);
    decode_modified_utf8(&body)
}

/// Reads a big-endian `i32`.
pub fn get_i32<B: Buf>(buf: &mut B) -> Result<i32> {
    if buf.remaining() < 4 {
        return Err(Error::eof("int"));
    }
    Ok(buf.get_i32())
}

/// Checks that a whole `[len][string][i32]` frame is buffered, without
/// advancing `buf`.
///
/// The length prefix is peeked from `buf.chunk()`; when the first chunk is
/// shorter than two bytes only the prefix itself can be checked.
pub fn check_frame<B: Buf>(buf: &B) -> Result<()> {
    if buf.remaining() < 2 {
        return Err(Error::eof("string length"));
    }
    if let [hi, lo, ..] = buf.chunk() {
        let len = u16::from_be_bytes([*hi, *lo]) as usize;
        if buf.remaining() < 2 + len + 4 {
            return Err(Error::eof("address frame"));
        }
    }
    Ok(())
}

/// Stream counterpart of [`get_modified_utf8`].
pub fn read_modified_utf8<R: Read>(reader: &mut R) -> Result<String> {
    let mut len = [0u8; 2];
    reader.read_exact(&mut len)?;
    let mut body = vec![0u8; u16::from_be_bytes(len) as usize];
    reader.read_exact(&mut body)?;
    decode_modified_utf8(&body)
}

/// Stream counterpart of [`get_i32`].
pub fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut raw = [0u8; 4];
    reader.read_exact(&mut raw)?;
    Ok(i32::from_be_bytes(raw))
}

/// Writes an already-encoded frame in one call.
pub fn write_all<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    Ok(())
}

fn decode_modified_utf8(body: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(body.len());
    let mut i = 0;

    while i < body.len() {
        let b0 = body[i] as u16;
        match b0 >> 4 {
            0x0..=0x7 => {
                units.push(b0);
                i += 1;
            }
            0xC | 0xD => {
                let b1 = continuation(body, i, 1)?;
                units.push(((b0 & 0x1F) << 6) | b1);
                i += 2;
            }
            0xE => {
                let b1 = continuation(body, i, 1)?;
                let b2 = continuation(body, i, 2)?;
                units.push(((b0 & 0x0F) << 12) | (b1 << 6) | b2);
                i += 3;
            }
            _ => {
                return Err(Error::invalid_data(format!(
                    "malformed input around byte {i}"
                )))
            }
        }
    }

    String::from_utf16(&units)
        .map_err(|_| Error::invalid_data("unpaired surrogate in string"))
}

/// Payload bits of the continuation byte at `start + offset`.
#[inline]
fn continuation(body: &[u8], start: usize, offset: usize) -> Result<u16> {
    match body.get(start + offset) {
        Some(b) if b & 0xC0 == 0x80 => Ok((*b & 0x3F) as u16),
        Some(_) => Err(Error::invalid_data(format!(
            "malformed input around byte {start}"
        ))),
        None => Err(Error::invalid_data("partial character at end")),
    }
}
