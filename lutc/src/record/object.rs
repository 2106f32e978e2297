//! Compiled object (`.lo`) codec.
//!
//! An object holds exactly one record so inputs can be compiled one at a
//! time and linked into a table later without re-deriving their bytes.
//!
//! Layout:
//! - `version`: 1 byte
//! - `key_count`: 1 byte
//! - `payload_len`: 4 bytes (u32, little-endian)
//! - `key_widths`: `key_count` bytes, one per level
//! - `keys`: raw key bytes, concatenated in level order
//! - `payload`: `payload_len` bytes
//! - `checksum`: 1 byte

use std::fmt;

use crate::record::entry::{Key, Record};

/// Object format version written and accepted by this crate.
pub const OBJECT_VERSION: u8 = 1;

/// File extension of compiled objects (without the dot).
pub const OBJECT_EXTENSION: &str = "lo";

/// Size of the fixed part of the object header.
const FIXED_HEADER_SIZE: usize = 6;

/// Encode a record as a compiled object.
///
/// # Errors
///
/// Returns an error if the record has more than 255 keys, a key wider than
/// 255 bytes, or a payload longer than `u32::MAX` bytes.
pub fn encode_object(record: &Record) -> Result<Vec<u8>, ObjectError> {
    let key_count =
        u8::try_from(record.keys.len()).map_err(|_| ObjectError::TooManyKeys(record.keys.len()))?;
    let payload_len = u32::try_from(record.payload.len())
        .map_err(|_| ObjectError::PayloadTooLarge(record.payload.len()))?;

    let key_bytes: usize = record.keys.iter().map(Key::width).sum();
    let mut buf = Vec::with_capacity(
        FIXED_HEADER_SIZE + record.keys.len() + key_bytes + record.payload.len() + 1,
    );

    buf.push(OBJECT_VERSION);
    buf.push(key_count);
    buf.extend_from_slice(&payload_len.to_le_bytes());
    for (level, key) in record.keys.iter().enumerate() {
        let width = u8::try_from(key.width()).map_err(|_| ObjectError::KeyTooWide {
            level,
            width: key.width(),
        })?;
        buf.push(width);
    }
    for key in &record.keys {
        buf.extend_from_slice(key.as_bytes());
    }
    buf.extend_from_slice(&record.payload);
    buf.push(record.checksum);

    Ok(buf)
}

/// Decode a compiled object.
///
/// The checksum is carried as-is; it is not recomputed.
///
/// # Errors
///
/// Returns an error if the version byte is not [`OBJECT_VERSION`], if the
/// buffer ends before every field the header promises, or if bytes follow
/// the checksum.
pub fn decode_object(bytes: &[u8]) -> Result<Record, ObjectError> {
    let mut cursor = Cursor::new(bytes);

    let version = cursor.take_u8()?;
    if version != OBJECT_VERSION {
        return Err(ObjectError::UnsupportedVersion(version));
    }

    let key_count = usize::from(cursor.take_u8()?);
    let payload_len = cursor.take_u32()? as usize;
    let widths = cursor.take(key_count)?.to_vec();

    let mut keys = Vec::with_capacity(key_count);
    for width in widths {
        keys.push(Key::from(cursor.take(usize::from(width))?));
    }
    let payload = cursor.take(payload_len)?.to_vec();
    let checksum = cursor.take_u8()?;

    let trailing = cursor.remaining();
    if trailing != 0 {
        return Err(ObjectError::TrailingBytes(trailing));
    }

    Ok(Record::new(keys, payload, checksum))
}

/// Bounds-checked forward reader over an object buffer.
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ObjectError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ObjectError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, ObjectError> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32, ObjectError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

/// Errors produced by the object codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// The version byte is not one this crate understands.
    UnsupportedVersion(u8),
    /// The buffer ended before a field the header promised.
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Bytes remain after the checksum.
    TrailingBytes(usize),
    /// More keys than the one-byte key count can express.
    TooManyKeys(usize),
    /// A key wider than the one-byte width field can express.
    KeyTooWide { level: usize, width: usize },
    /// A payload longer than the four-byte length field can express.
    PayloadTooLarge(usize),
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(v) => write!(
                f,
                "object file has unsupported version {v} (expected {OBJECT_VERSION})"
            ),
            Self::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "object file truncated at byte {offset}: needed {needed} bytes, {available} left"
            ),
            Self::TrailingBytes(n) => write!(f, "object file has {n} trailing bytes"),
            Self::TooManyKeys(n) => write!(f, "record has {n} keys, at most 255 fit an object"),
            Self::KeyTooWide { level, width } => write!(
                f,
                "key level {level} is {width} bytes wide, at most 255 fit an object"
            ),
            Self::PayloadTooLarge(n) => write!(f, "payload of {n} bytes does not fit an object"),
        }
    }
}

impl std::error::Error for ObjectError {}
