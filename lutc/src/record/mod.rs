//! Record model.
//!
//! A record is the unit of input: H fixed-width keys, an opaque payload, and
//! a checksum computed upstream. Records arrive either as normalized JSON
//! or as pre-compiled `.lo` objects.

mod entry;
mod input;
mod object;

pub use entry::{
    Key, KeyShape, KeyWidthMismatch, MAX_KEY_WIDTH, MAX_LEVELS, MIN_LEVELS, Record,
    SENTINEL_BYTE, ShapeError,
};
pub use input::{InputError, is_object_path, load_record, parse_record, record_to_json};
pub use object::{OBJECT_EXTENSION, OBJECT_VERSION, ObjectError, decode_object, encode_object};
