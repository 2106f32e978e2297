//! Binary table layout: page buffers, record placement, the serializer,
//! and a reader that follows the firmware's traversal.

mod geometry;
mod page;
mod reader;
mod writer;

pub use geometry::{
    GLOBAL_HEADER_FIXED_SIZE, HeaderGeometry, LeafGeometry, PAGE_INDEX_SIZE, global_header_size,
};
pub use page::{PageRun, PageView};
pub use reader::{Entry, LutHeader, LutReader, ReadError};
pub use writer::{LUT_VERSION, LayoutError, LutWriter};
