//! Keys, records, and the key shape every record in a run must match.
//!
//! # Invariants
//!
//! - A `KeyShape` always has between [`MIN_LEVELS`] and [`MAX_LEVELS`] levels.
//! - Every level width is in `1..=255` so it fits the one-byte width fields
//!   of both the table header and the object format.

use std::cmp::Ordering;
use std::fmt;

/// Fewest key levels a table can have: one structure key plus one discriminator.
pub const MIN_LEVELS: usize = 2;

/// Most key levels a table can have (the level count is stored in one byte).
pub const MAX_LEVELS: usize = u8::MAX as usize;

/// Widest key a level can declare.
pub const MAX_KEY_WIDTH: usize = u8::MAX as usize;

/// Byte value filling the key of a sentinel header record.
pub const SENTINEL_BYTE: u8 = 0xFF;

/// A fixed-width key.
///
/// Keys order the way the on-device reader scans them: shorter keys first,
/// then equal-length keys as little-endian integers (highest byte index is
/// the most significant).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    /// Wrap raw key bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encode `value` as a little-endian key of `width` bytes.
    ///
    /// Bytes past the eighth are zero; bytes of `value` that do not fit are dropped.
    #[must_use]
    pub fn from_uint(value: u64, width: usize) -> Self {
        let le = value.to_le_bytes();
        Self((0..width).map(|i| le.get(i).copied().unwrap_or(0)).collect())
    }

    /// The all-0xFF key that terminates a header scan.
    #[must_use]
    pub fn sentinel(width: usize) -> Self {
        Self(vec![SENTINEL_BYTE; width])
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// True if every byte is 0xFF, i.e. the key reads as a sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|&b| b == SENTINEL_BYTE)
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.iter().rev().cmp(other.0.iter().rev()))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// One configuration record: its key path, opaque payload, and checksum.
///
/// The checksum is supplied upstream and carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub keys: Vec<Key>,
    pub payload: Vec<u8>,
    pub checksum: u8,
}

impl Record {
    #[must_use]
    pub const fn new(keys: Vec<Key>, payload: Vec<u8>, checksum: u8) -> Self {
        Self {
            keys,
            payload,
            checksum,
        }
    }

    /// Number of keys the record carries.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn height(&self) -> usize {
        self.keys.len()
    }

    /// The last key, distinguishing records within a structure group.
    #[must_use]
    pub fn discriminator(&self) -> Option<&Key> {
        self.keys.last()
    }

    /// Concatenation of every key in level order.
    #[must_use]
    pub fn full_path(&self) -> Vec<u8> {
        self.keys.iter().flat_map(|k| k.as_bytes().iter().copied()).collect()
    }

    /// Widths of the keys as carried, for shape error reports.
    #[must_use]
    pub fn key_widths(&self) -> Vec<usize> {
        self.keys.iter().map(Key::width).collect()
    }
}

/// Number of key levels and the width of each, fixed for one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShape {
    widths: Vec<usize>,
}

impl KeyShape {
    /// Build a shape from per-level widths.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than two or more than 255 levels,
    /// or a width is zero or above 255.
    pub fn new(widths: Vec<usize>) -> Result<Self, ShapeError> {
        if widths.len() < MIN_LEVELS {
            return Err(ShapeError::TooFewLevels(widths.len()));
        }
        if widths.len() > MAX_LEVELS {
            return Err(ShapeError::TooManyLevels(widths.len()));
        }
        for (level, &width) in widths.iter().enumerate() {
            if width == 0 {
                return Err(ShapeError::ZeroWidth { level });
            }
            if width > MAX_KEY_WIDTH {
                return Err(ShapeError::WidthTooLarge { level, width });
            }
        }
        Ok(Self { widths })
    }

    /// Number of key levels (H).
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn height(&self) -> usize {
        self.widths.len()
    }

    /// Number of index levels above the structure level (H - 2).
    #[must_use]
    pub fn indirection(&self) -> usize {
        self.height() - MIN_LEVELS
    }

    /// Level holding the structure key (H - 2).
    #[must_use]
    pub fn structure_level(&self) -> usize {
        self.height() - 2
    }

    /// Width of the key at `level`.
    #[must_use]
    pub fn width(&self, level: usize) -> usize {
        self.widths[level]
    }

    #[must_use]
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Width of the final (discriminator) key.
    #[must_use]
    pub fn discriminator_width(&self) -> usize {
        self.widths[self.height() - 1]
    }

    /// Check that `record` carries exactly one key per level at the declared widths.
    pub fn validate(&self, record: &Record) -> Result<(), KeyWidthMismatch> {
        let matches = record.keys.len() == self.widths.len()
            && record
                .keys
                .iter()
                .zip(&self.widths)
                .all(|(key, &width)| key.width() == width);
        if matches {
            Ok(())
        } else {
            Err(KeyWidthMismatch {
                expected: self.widths.clone(),
                actual: record.key_widths(),
            })
        }
    }
}

/// Error returned when a key shape is not representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    TooFewLevels(usize),
    TooManyLevels(usize),
    ZeroWidth { level: usize },
    WidthTooLarge { level: usize, width: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewLevels(n) => {
                write!(f, "need at least {MIN_LEVELS} key levels, got {n}")
            }
            Self::TooManyLevels(n) => {
                write!(f, "at most {MAX_LEVELS} key levels are supported, got {n}")
            }
            Self::ZeroWidth { level } => write!(f, "key level {level} has width 0"),
            Self::WidthTooLarge { level, width } => write!(
                f,
                "key level {level} has width {width}, maximum is {MAX_KEY_WIDTH}"
            ),
        }
    }
}

impl std::error::Error for ShapeError {}

/// A record whose keys do not match the run's key shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyWidthMismatch {
    pub expected: Vec<usize>,
    pub actual: Vec<usize>,
}

impl fmt::Display for KeyWidthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record has key widths {:?}, table expects {:?}",
            self.actual, self.expected
        )
    }
}

impl std::error::Error for KeyWidthMismatch {}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(bytes: &[u8]) -> Key {
        Key::from(bytes)
    }

    #[test]
    fn test_shorter_keys_sort_first() {
        assert!(key(&[0xFF]) < key(&[0x00, 0x00]));
        assert!(key(&[0x00, 0x00, 0x00]) > key(&[0xFF, 0xFF]));
    }

    #[test]
    fn test_equal_width_keys_compare_little_endian() {
        // 0x0100 vs 0x0001: the high byte (index 1) decides.
        assert!(key(&[0x00, 0x01]) > key(&[0x01, 0x00]));
        assert!(key(&[0x02, 0x00]) > key(&[0x01, 0x00]));
        assert_eq!(key(&[0x01, 0x02]).cmp(&key(&[0x01, 0x02])), Ordering::Equal);
    }

    #[test]
    fn test_from_uint_matches_little_endian_order() {
        let mut values = [70_000_u64, 1, 256, 255, 0];
        let mut keys: Vec<Key> = values.iter().map(|&v| Key::from_uint(v, 4)).collect();
        keys.sort();
        values.sort_unstable();
        let expected: Vec<Key> = values.iter().map(|&v| Key::from_uint(v, 4)).collect();
        assert_eq!(keys, expected);
        assert_eq!(Key::from_uint(0x0102, 3).as_bytes(), &[0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(Key::sentinel(3).is_sentinel());
        assert!(!key(&[0xFF, 0xFE]).is_sentinel());
        assert!(!Key::new(Vec::new()).is_sentinel());
    }

    #[test]
    fn test_shape_limits() {
        assert_eq!(KeyShape::new(vec![4]), Err(ShapeError::TooFewLevels(1)));
        assert_eq!(
            KeyShape::new(vec![4, 0]),
            Err(ShapeError::ZeroWidth { level: 1 })
        );
        assert_eq!(
            KeyShape::new(vec![256, 4]),
            Err(ShapeError::WidthTooLarge {
                level: 0,
                width: 256
            })
        );
        assert_eq!(
            KeyShape::new(vec![1; 256]),
            Err(ShapeError::TooManyLevels(256))
        );

        let shape = KeyShape::new(vec![1, 2, 4]).expect("valid shape");
        assert_eq!(shape.height(), 3);
        assert_eq!(shape.indirection(), 1);
        assert_eq!(shape.structure_level(), 1);
        assert_eq!(shape.discriminator_width(), 4);
    }

    #[test]
    fn test_validate_rejects_wrong_count_and_width() {
        let shape = KeyShape::new(vec![4, 4]).expect("valid shape");
        let good = Record::new(vec![Key::from_uint(1, 4), Key::from_uint(2, 4)], vec![0], 0);
        assert!(shape.validate(&good).is_ok());

        let short = Record::new(vec![Key::from_uint(1, 4)], vec![0], 0);
        let err = shape.validate(&short).expect_err("missing key");
        assert_eq!(err.actual, vec![4]);

        let narrow = Record::new(vec![Key::from_uint(1, 4), Key::from_uint(2, 2)], vec![], 0);
        let err = shape.validate(&narrow).expect_err("narrow key");
        assert_eq!(
            err.to_string(),
            "record has key widths [4, 2], table expects [4, 4]"
        );
    }

    #[test]
    fn test_full_path_concatenates_levels() {
        let record = Record::new(vec![Key::from(&[1u8, 2][..]), Key::from(&[3u8][..])], vec![], 0);
        assert_eq!(record.full_path(), vec![1, 2, 3]);
        assert_eq!(record.discriminator(), Some(&Key::from(&[3u8][..])));
    }
}
