//! Page buffers for table serialization.
//!
//! A table is a run of equally sized pages. The page size is chosen per
//! table, so buffers carry it alongside the data instead of using a
//! compile-time constant.

/// A contiguous run of pages being written.
///
/// Offsets passed to the accessors are relative to the start of `page`.
/// Writes that cross a page boundary are a caller bug and panic.
pub struct PageRun {
    page_size: usize,
    data: Vec<u8>,
}

impl PageRun {
    /// Create `pages` zeroed pages.
    #[must_use]
    pub fn zeroed(page_size: usize, pages: usize) -> Self {
        Self::filled(page_size, pages, 0)
    }

    /// Create `pages` pages with every byte set to `fill`.
    #[must_use]
    pub fn filled(page_size: usize, pages: usize, fill: u8) -> Self {
        Self {
            page_size,
            data: vec![fill; page_size * pages],
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.data.len().checked_div(self.page_size).unwrap_or(0)
    }

    fn position(&self, page: usize, offset: usize, len: usize) -> usize {
        assert!(
            offset + len <= self.page_size,
            "write of {len} bytes at offset {offset} crosses a {}-byte page",
            self.page_size
        );
        page * self.page_size + offset
    }

    /// Read bytes at an offset within a page.
    #[must_use]
    pub fn read_bytes(&self, page: usize, offset: usize, len: usize) -> &[u8] {
        let start = self.position(page, offset, len);
        &self.data[start..start + len]
    }

    /// Write bytes at an offset within a page.
    pub fn write_bytes(&mut self, page: usize, offset: usize, bytes: &[u8]) {
        let start = self.position(page, offset, bytes.len());
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    #[must_use]
    pub fn read_u8(&self, page: usize, offset: usize) -> u8 {
        self.read_bytes(page, offset, 1)[0]
    }

    pub fn write_u8(&mut self, page: usize, offset: usize, value: u8) {
        self.write_bytes(page, offset, &[value]);
    }

    /// Read a u16 (little-endian) at an offset within a page.
    #[must_use]
    pub fn read_u16(&self, page: usize, offset: usize) -> u16 {
        let b = self.read_bytes(page, offset, 2);
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Write a u16 (little-endian) at an offset within a page.
    pub fn write_u16(&mut self, page: usize, offset: usize, value: u16) {
        self.write_bytes(page, offset, &value.to_le_bytes());
    }

    /// Append another run's pages after this run's pages.
    pub fn append(&mut self, other: Self) {
        assert_eq!(
            self.page_size, other.page_size,
            "cannot join runs of different page sizes"
        );
        self.data.extend(other.data);
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for PageRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRun")
            .field("page_size", &self.page_size)
            .field("pages", &self.page_count())
            .finish_non_exhaustive()
    }
}

/// Read-only, bounds-checked view of a serialized table.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    page_size: usize,
    data: &'a [u8],
}

impl<'a> PageView<'a> {
    #[must_use]
    pub const fn new(page_size: usize, data: &'a [u8]) -> Self {
        Self { page_size, data }
    }

    #[must_use]
    pub const fn page_count(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.data.len() / self.page_size
        }
    }

    /// Read bytes at an offset within a page, or `None` if they fall outside
    /// the page or the buffer.
    #[must_use]
    pub fn read_bytes(&self, page: usize, offset: usize, len: usize) -> Option<&'a [u8]> {
        if offset.checked_add(len)? > self.page_size {
            return None;
        }
        let start = page.checked_mul(self.page_size)?.checked_add(offset)?;
        self.data.get(start..start.checked_add(len)?)
    }

    #[must_use]
    pub fn read_u16(&self, page: usize, offset: usize) -> Option<u16> {
        self.read_bytes(page, offset, 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    }
}
