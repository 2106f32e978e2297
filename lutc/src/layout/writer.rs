//! Recursive paged serializer.
//!
//! Table layout, all integers little-endian:
//!
//! ```text
//! page 0           global header: version, H-2, u16 page size, H widths, zero fill
//! page 1..         root sub-blob
//!
//! sub-blob of a node = header pages, then each child's sub-blob in sibling order
//! header           reserved region of key_width bytes holding the child count,
//!                  [key][u16 page index] per child, [FF..FF][u16 total pages],
//!                  0xFF fill
//! leaf group       [discriminator][payload][checksum] per entry, zero fill
//! ```
//!
//! Page indices in a header are relative to the first page of that header's
//! own sub-blob.
//!
//! Index headers store the child count in the whole reserved region. Headers
//! whose children are structure nodes store it in at most the low two bytes
//! and leave the rest of the region 0xFF, as deployed readers expect.

use std::fmt;

use crate::layout::geometry::{HeaderGeometry, LeafGeometry, global_header_size};
use crate::layout::page::PageRun;
use crate::record::{Key, SENTINEL_BYTE};
use crate::tree::{LutTree, NodeId};

/// Bytes of the child count in a header whose children are structure nodes.
const STRUCTURE_COUNT_SIZE: usize = 2;

/// Table format version written into the global header.
pub const LUT_VERSION: u8 = 1;

/// Serializes one tree at one page size.
#[derive(Debug)]
pub struct LutWriter<'a> {
    tree: &'a LutTree,
    page_size: u16,
}

impl<'a> LutWriter<'a> {
    #[must_use]
    pub const fn new(tree: &'a LutTree, page_size: u16) -> Self {
        Self { tree, page_size }
    }

    fn page_size(&self) -> usize {
        usize::from(self.page_size)
    }

    /// Serialize the whole table.
    ///
    /// # Errors
    ///
    /// Fails if some part does not fit the page size, a page index does not
    /// fit 16 bits, or a structure group mixes payload sizes.
    pub fn write(&self) -> Result<Vec<u8>, LayoutError> {
        let mut table = self.write_global_header()?;
        let root = self.write_indirect(LutTree::ROOT, self.tree.shape().indirection())?;
        table.append(root);

        let pages = table.page_count();
        if pages > usize::from(u16::MAX) {
            return Err(LayoutError::PageIndexOverflow { pages });
        }
        tracing::trace!(pages, page_size = self.page_size, "table serialized");
        Ok(table.into_bytes())
    }

    /// The global header page.
    pub fn write_global_header(&self) -> Result<PageRun, LayoutError> {
        let shape = self.tree.shape();
        let required = global_header_size(shape.height());
        if self.page_size() < required {
            return Err(LayoutError::PageSizeTooSmall {
                page_size: self.page_size,
                required,
            });
        }

        let mut page = PageRun::zeroed(self.page_size(), 1);
        page.write_u8(0, 0, LUT_VERSION);
        page.write_u8(0, 1, narrow(shape.indirection()));
        page.write_u16(0, 2, self.page_size);
        for (level, &width) in shape.widths().iter().enumerate() {
            page.write_u8(0, 4 + level, narrow(width));
        }
        Ok(page)
    }

    /// Sub-blob of a root or index node whose children sit `level` index
    /// levels above the structure level.
    pub fn write_indirect(&self, id: NodeId, level: usize) -> Result<PageRun, LayoutError> {
        if level == 0 {
            return self.write_basic(id);
        }
        let children = self
            .tree
            .children(id)
            .iter()
            .map(|&child| self.write_indirect(child, level - 1))
            .collect::<Result<Vec<_>, _>>()?;
        self.assemble(id, children)
    }

    /// Sub-blob of a node whose children are structure nodes.
    pub fn write_basic(&self, id: NodeId) -> Result<PageRun, LayoutError> {
        let groups = self
            .tree
            .children(id)
            .iter()
            .map(|&structure| self.write_leaf_group(structure))
            .collect::<Result<Vec<_>, _>>()?;
        self.assemble(id, groups)
    }

    /// Leaf entries of one structure node.
    pub fn write_leaf_group(&self, id: NodeId) -> Result<PageRun, LayoutError> {
        let leaves = self.tree.children(id);
        let records = leaves
            .iter()
            .filter_map(|&leaf| self.tree.record(leaf))
            .collect::<Vec<_>>();
        let Some(first) = records.first() else {
            return Ok(PageRun::zeroed(self.page_size(), 0));
        };

        let payload_len = first.payload.len();
        let discriminator_width = self.tree.shape().discriminator_width();
        let entry_size = LeafGeometry::entry_size(discriminator_width, payload_len);
        let geometry = LeafGeometry::new(entry_size, self.page_size()).ok_or(
            LayoutError::PageSizeTooSmall {
                page_size: self.page_size,
                required: entry_size,
            },
        )?;

        let mut run = PageRun::zeroed(self.page_size(), geometry.pages_for(records.len()));
        for (index, record) in records.iter().enumerate() {
            if record.payload.len() != payload_len {
                return Err(LayoutError::PayloadSizeMismatch {
                    path: self.tree.full_path(id),
                    expected: payload_len,
                    actual: record.payload.len(),
                });
            }
            let (page, offset) = geometry.slot(index);
            let discriminator = record.discriminator().map_or(&[][..], Key::as_bytes);
            run.write_bytes(page, offset, discriminator);
            run.write_bytes(page, offset + discriminator_width, &record.payload);
            run.write_u8(page, offset + discriminator_width + payload_len, record.checksum);
        }
        Ok(run)
    }

    /// Prefix the children's sub-blobs with a header indexing them.
    fn assemble(&self, id: NodeId, children: Vec<PageRun>) -> Result<PageRun, LayoutError> {
        let node = self.tree.node(id);
        let key_width = self.tree.shape().width(node.depth());
        let geometry = HeaderGeometry::new(key_width, self.page_size()).ok_or(
            LayoutError::PageSizeTooSmall {
                page_size: self.page_size,
                required: HeaderGeometry::min_page_size(key_width),
            },
        )?;

        let child_ids = node.children();
        let header_pages = geometry.pages_for(child_ids.len() + 1);
        let mut header = PageRun::filled(self.page_size(), header_pages, SENTINEL_BYTE);

        let count = Key::from_uint(child_ids.len() as u64, key_width);
        let count_size = if node.depth() == self.tree.shape().structure_level() {
            key_width.min(STRUCTURE_COUNT_SIZE)
        } else {
            key_width
        };
        header.write_bytes(0, 0, &count.as_bytes()[..count_size]);

        let mut next_page = header_pages;
        for (index, (&child, blob)) in child_ids.iter().zip(&children).enumerate() {
            let key = self.tree.node(child).key().map_or(&[][..], Key::as_bytes);
            let (page, offset) = geometry.slot(index);
            header.write_bytes(page, offset, key);
            header.write_u16(page, offset + key_width, page_index(next_page)?);
            next_page += blob.page_count();
        }

        let (page, offset) = geometry.slot(child_ids.len());
        header.write_bytes(page, offset, Key::sentinel(key_width).as_bytes());
        header.write_u16(page, offset + key_width, page_index(next_page)?);

        for blob in children {
            header.append(blob);
        }
        Ok(header)
    }
}

fn page_index(pages: usize) -> Result<u16, LayoutError> {
    u16::try_from(pages).map_err(|_| LayoutError::PageIndexOverflow { pages })
}

/// Narrow a value the key shape already bounds to one byte.
#[allow(clippy::cast_possible_truncation)] // KeyShape caps levels and widths at 255
const fn narrow(value: usize) -> u8 {
    value as u8
}

/// Errors raised while laying out a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A part of the table needs a larger page.
    PageSizeTooSmall { page_size: u16, required: usize },
    /// A page index or the table's page count does not fit 16 bits.
    PageIndexOverflow { pages: usize },
    /// A structure group holds entries with different payload lengths.
    PayloadSizeMismatch {
        path: Vec<u8>,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageSizeTooSmall {
                page_size,
                required,
            } => write!(
                f,
                "page size {page_size} is too small: at least {required} bytes are needed"
            ),
            Self::PageIndexOverflow { pages } => {
                write!(f, "table needs {pages} pages, more than a 16-bit page index can address")
            }
            Self::PayloadSizeMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "structure {} mixes payload sizes {expected} and {actual}",
                crate::duplicates::format_key_path(path)
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{KeyShape, Record};

    fn build(widths: &[usize], records: &[(&[u64], &[u8])]) -> LutTree {
        let shape = KeyShape::new(widths.to_vec()).expect("valid shape");
        let records = records.iter().map(|(keys, payload)| {
            Record::new(
                keys.iter()
                    .zip(widths)
                    .map(|(&k, &w)| Key::from_uint(k, w))
                    .collect(),
                payload.to_vec(),
                0xC5,
            )
        });
        LutTree::from_records(shape, records).expect("build")
    }

    #[test]
    fn test_global_header_bytes() {
        let tree = build(&[1, 2, 4], &[(&[1, 1, 1], &[9])]);
        let page = LutWriter::new(&tree, 16)
            .write_global_header()
            .expect("fits");
        assert_eq!(
            page.into_bytes(),
            vec![1, 1, 16, 0, 1, 2, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_global_header_needs_room_for_widths() {
        let tree = build(&[1; 8], &[]);
        assert_eq!(
            LutWriter::new(&tree, 11).write_global_header().map(|_| ()),
            Err(LayoutError::PageSizeTooSmall {
                page_size: 11,
                required: 12
            })
        );
    }

    #[test]
    fn test_leaf_group_packs_entries() {
        let tree = build(&[1, 2], &[(&[1, 0x0201], &[0xAA]), (&[1, 0x0302], &[0xBB])]);
        let structure = tree.children(LutTree::ROOT)[0];
        let run = LutWriter::new(&tree, 8)
            .write_leaf_group(structure)
            .expect("fits");
        // 4-byte entries, two per 8-byte page.
        assert_eq!(
            run.into_bytes(),
            vec![0x01, 0x02, 0xAA, 0xC5, 0x02, 0x03, 0xBB, 0xC5]
        );
    }

    #[test]
    fn test_header_wraps_onto_later_pages() {
        // Three structures with 1-byte keys at 9-byte pages: two records fit
        // the first header page (after the count byte), the rest wrap.
        let tree = build(&[1, 1], &[(&[1, 1], &[1]), (&[2, 1], &[2]), (&[3, 1], &[3])]);
        let bytes = LutWriter::new(&tree, 9).write().expect("writes");
        let header = &bytes[9..27];
        assert_eq!(
            header,
            &[
                3, 1, 2, 0, 2, 3, 0, 0xFF, 0xFF, // count, [1]->2, [2]->3
                3, 4, 0, 0xFF, 5, 0, 0xFF, 0xFF, 0xFF, // [3]->4, sentinel->5
            ]
        );
        // global + 2 header pages + 3 leaf pages
        assert_eq!(bytes.len(), 6 * 9);
    }

    #[test]
    fn test_child_count_region_per_level() {
        let tree = build(&[4, 4, 4], &[(&[1, 1, 1], &[5])]);
        let bytes = LutWriter::new(&tree, 32).write().expect("writes");

        // Root indexes index nodes: the count fills the reserved region.
        assert_eq!(&bytes[32..42], &[1, 0, 0, 0, 1, 0, 0, 0, 1, 0]);
        // This header indexes structure nodes: two count bytes, then 0xFF.
        assert_eq!(
            &bytes[64..80],
            &[1, 0, 0xFF, 0xFF, 1, 0, 0, 0, 1, 0, 0xFF, 0xFF, 0xFF, 0xFF, 2, 0]
        );
    }

    #[test]
    fn test_mixed_payload_sizes_rejected() {
        let tree = build(&[1, 1], &[(&[1, 1], &[1]), (&[1, 2], &[1, 2])]);
        assert_eq!(
            LutWriter::new(&tree, 32).write(),
            Err(LayoutError::PayloadSizeMismatch {
                path: vec![1],
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_page_size_too_small_for_header() {
        let tree = build(&[4, 1], &[(&[1, 1], &[1])]);
        assert_eq!(
            LutWriter::new(&tree, 15).write(),
            Err(LayoutError::PageSizeTooSmall {
                page_size: 15,
                required: 16
            })
        );
    }
}
