//! Where records land inside a page run.
//!
//! The writer, the reader, and the size estimators all place records through
//! these types, so a table always occupies exactly the pages its estimate
//! predicted.

/// Size of a header record's page index field.
pub const PAGE_INDEX_SIZE: usize = 2;

/// Size of the fixed part of the global header: version, indirection count,
/// and the 2-byte page size. One width byte per level follows.
pub const GLOBAL_HEADER_FIXED_SIZE: usize = 4;

/// Smallest page that holds the global header of a table with `levels` keys.
#[must_use]
pub const fn global_header_size(levels: usize) -> usize {
    GLOBAL_HEADER_FIXED_SIZE + levels
}

/// Placement of `[key][u16 page index]` records in a level header.
///
/// The first page starts with a reserved region of `key_width` bytes holding
/// the child count; later pages hold records only. Records never straddle
/// pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderGeometry {
    key_width: usize,
    first_capacity: usize,
    later_capacity: usize,
}

impl HeaderGeometry {
    /// Size of one header record for keys of `key_width` bytes.
    #[must_use]
    pub const fn record_size(key_width: usize) -> usize {
        key_width + PAGE_INDEX_SIZE
    }

    /// Smallest page that holds the reserved region, one child, and the sentinel.
    #[must_use]
    pub const fn min_page_size(key_width: usize) -> usize {
        key_width + 2 * Self::record_size(key_width)
    }

    /// Geometry for `page_size`, or `None` if the page is below [`Self::min_page_size`].
    #[must_use]
    pub const fn new(key_width: usize, page_size: usize) -> Option<Self> {
        if page_size < Self::min_page_size(key_width) {
            return None;
        }
        let record = Self::record_size(key_width);
        Some(Self {
            key_width,
            first_capacity: (page_size - key_width) / record,
            later_capacity: page_size / record,
        })
    }

    #[must_use]
    pub const fn key_width(&self) -> usize {
        self.key_width
    }

    /// Pages needed for `records` header records (children plus sentinel).
    #[must_use]
    pub const fn pages_for(&self, records: usize) -> usize {
        if records <= self.first_capacity {
            1
        } else {
            1 + (records - self.first_capacity).div_ceil(self.later_capacity)
        }
    }

    /// Page and in-page offset of record `index`.
    #[must_use]
    pub const fn slot(&self, index: usize) -> (usize, usize) {
        let record = Self::record_size(self.key_width);
        if index < self.first_capacity {
            (0, self.key_width + index * record)
        } else {
            let rest = index - self.first_capacity;
            (
                1 + rest / self.later_capacity,
                (rest % self.later_capacity) * record,
            )
        }
    }
}

/// Placement of fixed-size `[discriminator][payload][checksum]` entries in a
/// leaf group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafGeometry {
    entry_size: usize,
    per_page: usize,
}

impl LeafGeometry {
    /// Size of one entry.
    #[must_use]
    pub const fn entry_size(discriminator_width: usize, payload_len: usize) -> usize {
        discriminator_width + payload_len + 1
    }

    /// Geometry for `page_size`, or `None` if not even one entry fits a page.
    #[must_use]
    pub const fn new(entry_size: usize, page_size: usize) -> Option<Self> {
        if entry_size == 0 || page_size < entry_size {
            return None;
        }
        Some(Self {
            entry_size,
            per_page: page_size / entry_size,
        })
    }

    #[must_use]
    pub const fn per_page(&self) -> usize {
        self.per_page
    }

    /// Pages needed for `entries` entries.
    #[must_use]
    pub const fn pages_for(&self, entries: usize) -> usize {
        entries.div_ceil(self.per_page)
    }

    /// Page and in-page offset of entry `index`.
    #[must_use]
    pub const fn slot(&self, index: usize) -> (usize, usize) {
        (
            index / self.per_page,
            (index % self.per_page) * self.entry_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_minimum() {
        assert_eq!(HeaderGeometry::min_page_size(4), 16);
        assert!(HeaderGeometry::new(4, 15).is_none());
        assert!(HeaderGeometry::new(4, 16).is_some());
    }

    #[test]
    fn test_header_single_page() {
        // 64-byte page, 4-byte keys: (64 - 4) / 6 = 10 records on the first page.
        let g = HeaderGeometry::new(4, 64).expect("fits");
        assert_eq!(g.pages_for(3), 1);
        assert_eq!(g.pages_for(10), 1);
        assert_eq!(g.slot(0), (0, 4));
        assert_eq!(g.slot(2), (0, 16));
    }

    #[test]
    fn test_header_overflow_counts_first_page() {
        // 1-byte keys on 9-byte pages: 2 records on the first page, 3 on later ones.
        let g = HeaderGeometry::new(1, 9).expect("fits");
        assert_eq!(g.pages_for(2), 1);
        assert_eq!(g.pages_for(3), 2);
        assert_eq!(g.pages_for(5), 2);
        assert_eq!(g.pages_for(6), 3);

        assert_eq!(g.slot(1), (0, 4));
        assert_eq!(g.slot(2), (1, 0));
        assert_eq!(g.slot(4), (1, 6));
        assert_eq!(g.slot(5), (2, 0));
    }

    #[test]
    fn test_leaf_packing() {
        assert_eq!(LeafGeometry::entry_size(4, 1), 6);
        assert!(LeafGeometry::new(6, 5).is_none());

        let g = LeafGeometry::new(6, 16).expect("fits");
        assert_eq!(g.per_page(), 2);
        assert_eq!(g.pages_for(1), 1);
        assert_eq!(g.pages_for(3), 2);
        assert_eq!(g.slot(1), (0, 6));
        assert_eq!(g.slot(2), (1, 0));
    }
}
