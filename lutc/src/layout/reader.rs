//! Host-side table reader.
//!
//! Walks a serialized table the way the firmware does: scan each level
//! header linearly for the wanted key, jump to the page it names, and scan
//! the structure's leaf entries last. The compiler uses it to prove every
//! record is reachable before any output is written.

use std::fmt;

use crate::layout::geometry::{HeaderGeometry, LeafGeometry, global_header_size};
use crate::layout::page::PageView;
use crate::layout::writer::LUT_VERSION;
use crate::record::{Key, MIN_LEVELS, SENTINEL_BYTE};

/// Parsed global header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutHeader {
    pub version: u8,
    pub page_size: u16,
    pub widths: Vec<usize>,
}

impl LutHeader {
    /// Number of index levels above the structure level.
    #[must_use]
    pub fn indirection(&self) -> usize {
        self.widths.len() - MIN_LEVELS
    }
}

/// A leaf entry found by [`LutReader::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub payload: &'a [u8],
    pub checksum: u8,
}

/// Read-only access to a serialized table.
#[derive(Debug)]
pub struct LutReader<'a> {
    view: PageView<'a>,
    header: LutHeader,
}

impl<'a> LutReader<'a> {
    /// Parse and validate the global header.
    pub fn open(bytes: &'a [u8]) -> Result<Self, ReadError> {
        let fixed = bytes.get(..4).ok_or(ReadError::Truncated {
            page: 0,
            offset: 0,
        })?;
        let version = fixed[0];
        if version != LUT_VERSION {
            return Err(ReadError::UnsupportedVersion(version));
        }
        let levels = usize::from(fixed[1]) + MIN_LEVELS;
        let page_size = u16::from_le_bytes([fixed[2], fixed[3]]);
        let size = usize::from(page_size);

        if size < global_header_size(levels) {
            return Err(ReadError::BadGeometry(format!(
                "page size {page_size} cannot hold a header for {levels} levels"
            )));
        }
        if bytes.len() < size || bytes.len() % size != 0 {
            return Err(ReadError::BadGeometry(format!(
                "table of {} bytes is not a whole number of {page_size}-byte pages",
                bytes.len()
            )));
        }

        let widths: Vec<usize> = bytes[4..4 + levels].iter().map(|&w| usize::from(w)).collect();
        if let Some(level) = widths.iter().position(|&w| w == 0) {
            return Err(ReadError::BadGeometry(format!("key level {level} has width 0")));
        }

        Ok(Self {
            view: PageView::new(size, bytes),
            header: LutHeader {
                version,
                page_size,
                widths,
            },
        })
    }

    #[must_use]
    pub const fn header(&self) -> &LutHeader {
        &self.header
    }

    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.view.page_count()
    }

    /// Find the entry stored under `keys`.
    ///
    /// `payload_len` is the payload size of the key's structure group; the
    /// table does not record it. Returns `Ok(None)` if the key is absent.
    pub fn lookup(&self, keys: &[Key], payload_len: usize) -> Result<Option<Entry<'a>>, ReadError> {
        let widths = &self.header.widths;
        let shape_matches = keys.len() == widths.len()
            && keys.iter().zip(widths).all(|(key, &width)| key.width() == width);
        if !shape_matches {
            return Err(ReadError::KeyShape {
                expected: widths.clone(),
                actual: keys.iter().map(Key::width).collect(),
            });
        }

        let page_size = usize::from(self.header.page_size);
        let structure_level = widths.len() - 2;
        let mut base = 1;
        let mut span = 0;
        for (level, key) in keys[..=structure_level].iter().enumerate() {
            let geometry = HeaderGeometry::new(widths[level], page_size).ok_or_else(|| {
                ReadError::BadGeometry(format!(
                    "page size {page_size} cannot hold a header for {}-byte keys",
                    widths[level]
                ))
            })?;
            let Some((first, next)) = self.scan_header(&geometry, base, key)? else {
                return Ok(None);
            };
            base += usize::from(first);
            span = usize::from(next).saturating_sub(usize::from(first));
        }

        let discriminator = &keys[structure_level + 1];
        let entry_size = LeafGeometry::entry_size(discriminator.width(), payload_len);
        let geometry = LeafGeometry::new(entry_size, page_size).ok_or_else(|| {
            ReadError::BadGeometry(format!(
                "page size {page_size} cannot hold a {entry_size}-byte entry"
            ))
        })?;
        self.scan_leaves(&geometry, base, span, discriminator, payload_len)
    }

    /// Scan a header starting at page `base` for `key`. Returns the matched
    /// record's page index and the one after it, or `None` at the sentinel.
    fn scan_header(
        &self,
        geometry: &HeaderGeometry,
        base: usize,
        key: &Key,
    ) -> Result<Option<(u16, u16)>, ReadError> {
        let width = geometry.key_width();
        let mut found: Option<u16> = None;
        let mut index = 0;
        loop {
            let (page, offset) = geometry.slot(index);
            index += 1;
            let page = base + page;
            let candidate = self.read(page, offset, width)?;
            let pointer = self
                .view
                .read_u16(page, offset + width)
                .ok_or(ReadError::Truncated {
                    page,
                    offset: offset + width,
                })?;
            if let Some(first) = found {
                return Ok(Some((first, pointer)));
            }
            if candidate.iter().all(|&b| b == SENTINEL_BYTE) {
                return Ok(None);
            }
            if candidate == key.as_bytes() {
                found = Some(pointer);
            }
        }
    }

    fn scan_leaves(
        &self,
        geometry: &LeafGeometry,
        base: usize,
        span: usize,
        discriminator: &Key,
        payload_len: usize,
    ) -> Result<Option<Entry<'a>>, ReadError> {
        let width = discriminator.width();
        let mut previous: Option<Key> = None;
        for index in 0..span * geometry.per_page() {
            let (page, offset) = geometry.slot(index);
            let page = base + page;
            let candidate = Key::from(self.read(page, offset, width)?);
            // Entries ascend; the first slot that does not is zero padding.
            if previous.as_ref().is_some_and(|p| candidate <= *p) {
                break;
            }
            if candidate == *discriminator {
                let payload = self.read(page, offset + width, payload_len)?;
                let checksum = self.read(page, offset + width + payload_len, 1)?[0];
                return Ok(Some(Entry { payload, checksum }));
            }
            previous = Some(candidate);
        }
        Ok(None)
    }

    fn read(&self, page: usize, offset: usize, len: usize) -> Result<&'a [u8], ReadError> {
        self.view
            .read_bytes(page, offset, len)
            .ok_or(ReadError::Truncated { page, offset })
    }
}

/// Errors raised while reading a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The version byte is not one this crate understands.
    UnsupportedVersion(u8),
    /// A read ran past the end of the table.
    Truncated { page: usize, offset: usize },
    /// The global header describes a layout that cannot exist.
    BadGeometry(String),
    /// The lookup keys do not match the table's key widths.
    KeyShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(v) => write!(
                f,
                "table has unsupported version {v} (expected {LUT_VERSION})"
            ),
            Self::Truncated { page, offset } => {
                write!(f, "table truncated: page {page} offset {offset} is out of range")
            }
            Self::BadGeometry(message) => write!(f, "malformed table: {message}"),
            Self::KeyShape { expected, actual } => write!(
                f,
                "lookup keys have widths {actual:?}, table expects {expected:?}"
            ),
        }
    }
}

impl std::error::Error for ReadError {}

#[cfg(test)]
mod tests {
    use super::*;

    /// The three-record scenario at 64-byte pages, written out by hand.
    fn scenario_bytes() -> Vec<u8> {
        let mut table = vec![0u8; 256];
        table[..6].copy_from_slice(&[1, 0, 64, 0, 4, 4]);

        let mut header = vec![0xFF; 64];
        header[..22].copy_from_slice(&[
            2, 0, 0xFF, 0xFF, // count
            1, 0, 0, 0, 1, 0, // structure 1 -> page 1
            2, 0, 0, 0, 2, 0, // structure 2 -> page 2
            0xFF, 0xFF, 0xFF, 0xFF, 3, 0, // sentinel -> 3 pages
        ]);
        table[64..128].copy_from_slice(&header);

        table[128..140].copy_from_slice(&[0x0A, 0, 0, 0, 0x11, 0xA1, 0x0B, 0, 0, 0, 0x22, 0xA2]);
        table[192..198].copy_from_slice(&[0x0A, 0, 0, 0, 0x33, 0xA3]);
        table
    }

    fn keys(structure: u64, discriminator: u64) -> Vec<Key> {
        vec![Key::from_uint(structure, 4), Key::from_uint(discriminator, 4)]
    }

    #[test]
    fn test_open_parses_header() {
        let bytes = scenario_bytes();
        let reader = LutReader::open(&bytes).expect("opens");
        assert_eq!(
            reader.header(),
            &LutHeader {
                version: 1,
                page_size: 64,
                widths: vec![4, 4]
            }
        );
        assert_eq!(reader.header().indirection(), 0);
        assert_eq!(reader.page_count(), 4);
    }

    #[test]
    fn test_lookup_finds_every_entry() {
        let bytes = scenario_bytes();
        let reader = LutReader::open(&bytes).expect("opens");
        for (s, d, payload, checksum) in [(1, 0x0A, 0x11, 0xA1), (1, 0x0B, 0x22, 0xA2), (2, 0x0A, 0x33, 0xA3)] {
            let entry = reader.lookup(&keys(s, d), 1).expect("reads").expect("present");
            assert_eq!(entry.payload, &[payload]);
            assert_eq!(entry.checksum, checksum);
        }
    }

    #[test]
    fn test_lookup_misses() {
        let bytes = scenario_bytes();
        let reader = LutReader::open(&bytes).expect("opens");
        assert_eq!(reader.lookup(&keys(3, 0x0A), 1), Ok(None));
        assert_eq!(reader.lookup(&keys(2, 0x0B), 1), Ok(None));
        // A zero discriminator must not match the zero padding after entries.
        assert_eq!(reader.lookup(&keys(2, 0), 1), Ok(None));
    }

    #[test]
    fn test_lookup_rejects_wrong_key_shape() {
        let bytes = scenario_bytes();
        let reader = LutReader::open(&bytes).expect("opens");
        let short = vec![Key::from_uint(1, 4), Key::from_uint(0x0A, 2)];
        assert!(matches!(reader.lookup(&short, 1), Err(ReadError::KeyShape { .. })));
    }

    #[test]
    fn test_open_rejects_bad_tables() {
        let mut bytes = scenario_bytes();
        bytes[0] = 2;
        assert_eq!(
            LutReader::open(&bytes).map(|_| ()),
            Err(ReadError::UnsupportedVersion(2))
        );

        let bytes = scenario_bytes();
        assert!(matches!(
            LutReader::open(&bytes[..100]),
            Err(ReadError::BadGeometry(_))
        ));
        assert!(matches!(
            LutReader::open(&bytes[..3]),
            Err(ReadError::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_table_fails_lookup() {
        let bytes = scenario_bytes();
        let reader = LutReader::open(&bytes[..128]).expect("header page is intact");
        assert!(matches!(
            reader.lookup(&keys(1, 0x0A), 1),
            Err(ReadError::Truncated { .. })
        ));
    }
}
