//! End-to-end tests from records to table bytes and output files.
//!
//! Each test file covers a specific scenario, using deterministic inputs
//! (fixed records or seeded generators) so failures reproduce exactly.

#![cfg(test)]

mod helpers;

mod test_cli_run;
mod test_concrete_scenario;
mod test_duplicate_keys;
mod test_header_overflow;
mod test_indirection;
mod test_many_structures;
mod test_objects;
mod test_random_roundtrip;
