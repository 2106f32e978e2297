//! Footprint models for the parts of a table.
//!
//! Every part of a serialized table is one of three kinds: the global header
//! page, a level header listing a node's children, or a leaf group holding a
//! structure node's entries. Each kind reports the smallest page it can live
//! in, its size if it had a page to itself, and how many pages it takes at a
//! given page size.

use crate::layout::{HeaderGeometry, LeafGeometry, global_header_size};

/// Size model of one part of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Estimator {
    /// The single global header page of a table with `levels` key levels.
    GlobalHeader { levels: usize },
    /// A header listing `child_count` children keyed by `key_width`-byte keys.
    LevelHeader {
        key_width: usize,
        child_count: usize,
    },
    /// `entry_count` leaf entries of `entry_size` bytes each.
    LeafGroup {
        entry_size: usize,
        entry_count: usize,
    },
}

impl Estimator {
    /// Smallest page size this part can be laid out in.
    #[must_use]
    pub const fn min_size(&self) -> usize {
        match *self {
            Self::GlobalHeader { levels } => global_header_size(levels),
            Self::LevelHeader { key_width, .. } => HeaderGeometry::min_page_size(key_width),
            Self::LeafGroup { entry_size, .. } => entry_size,
        }
    }

    /// Bytes the part occupies when nothing has to wrap to another page.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        match *self {
            Self::GlobalHeader { levels } => global_header_size(levels),
            Self::LevelHeader {
                key_width,
                child_count,
            } => key_width + HeaderGeometry::record_size(key_width) * (child_count + 1),
            Self::LeafGroup {
                entry_size,
                entry_count,
            } => entry_size * entry_count,
        }
    }

    /// Pages the part takes at `page_size`, or `None` below [`Self::min_size`].
    #[must_use]
    pub const fn page_count(&self, page_size: usize) -> Option<usize> {
        if page_size < self.min_size() {
            return None;
        }
        match *self {
            Self::GlobalHeader { .. } => Some(1),
            Self::LevelHeader {
                key_width,
                child_count,
            } => match HeaderGeometry::new(key_width, page_size) {
                Some(geometry) => Some(geometry.pages_for(child_count + 1)),
                None => None,
            },
            Self::LeafGroup {
                entry_size,
                entry_count,
            } => match LeafGeometry::new(entry_size, page_size) {
                Some(geometry) => Some(geometry.pages_for(entry_count)),
                None => None,
            },
        }
    }
}
