// Life of a run:
// 1. Load every input: `.lo` objects or normalized JSON records
// 2. Validate record shapes against the configured key widths
// 3. Build the key-indexed tree and reject duplicate paths
// 4. Estimate every part of the table and pick a page size
// 5. Serialize headers and leaf groups, then read every record back
// 6. Write the output atomically
//
// With -c, step 2 is followed directly by encoding one object per input.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod compiler;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod layout;
pub mod optimize;
pub mod output;
pub mod record;
pub mod tree;

mod e2e_tests;
#[cfg(test)]
mod testing;

pub use compiler::{CompiledLut, compile, compile_objects};
pub use config::{LutConfig, PageSizeMode};
pub use error::CompileError;
pub use layout::LutReader;
pub use record::{Key, KeyShape, Record};
