// Little-endian primitive writers and readers for the binary container.
//
// `ByteWriter` appends fixed-width fields to a growable buffer; every layout
// in `encode.rs`, `logic.rs`, `options.rs` and `tables.rs` is spelled out as
// a sequence of its calls, so a layout reads top to bottom like the format
// description. `ByteReader` is the mirror image over a byte slice and is
// what tests and external decoders use to walk encoded output.
//
// Counts and length prefixes go through `count_u32`/`count_u16`, which
// refuse values that do not fit the binary field instead of truncating.

use std::io::{self, Cursor, Read};

use crate::error::StructuralError;

/// Convert a collection length into a u32 count field.
pub fn count_u32(what: &'static str, len: usize) -> Result<u32, StructuralError> {
    u32::try_from(len).map_err(|_| StructuralError::CountOverflow { what, len })
}

/// Convert a collection length into a u16 count field.
pub fn count_u16(what: &'static str, len: usize) -> Result<u16, StructuralError> {
    u16::try_from(len).map_err(|_| StructuralError::CountOverflow { what, len })
}

/// Append-only little-endian buffer builder.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write `bytes` into a fixed-width slot, zero-padding the remainder.
    /// Callers guarantee `bytes.len() <= width`.
    pub fn padded(&mut self, bytes: &[u8], width: usize) {
        let take = bytes.len().min(width);
        self.buf.extend_from_slice(&bytes[..take]);
        self.buf.resize(self.buf.len() + (width - take), 0);
    }

    /// Inline string: u32 byte length, then the UTF-8 bytes.
    pub fn prefixed_str(&mut self, what: &'static str, s: &str) -> Result<(), StructuralError> {
        self.u32(count_u32(what, s.len())?);
        self.bytes(s.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Little-endian field reader over a byte slice.
///
/// Every read returns `UnexpectedEof` if the slice runs out mid-field.
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    fn array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn u8(&mut self) -> io::Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> io::Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> io::Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub fn bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a u32-length-prefixed UTF-8 string.
    pub fn prefixed_str(&mut self) -> io::Result<String> {
        let len = self.u32()? as usize;
        String::from_utf8(self.bytes(len)?)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "string is not valid UTF-8"))
    }

    /// Byte offset of the next read.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }
}
