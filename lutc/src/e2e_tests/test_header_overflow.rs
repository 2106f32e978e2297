//! A root header spread over many pages.

use crate::compile;
use crate::config::PageSizeMode;
use crate::e2e_tests::helpers::*;
use crate::testing::{config, record};

const W: [usize; 2] = [1, 1];

/// Forty structures with one leaf each.
fn records() -> Vec<crate::Record> {
    (0..40)
        .map(|k| record(&W, &[k, 1], &[u8::try_from(k).expect("small")]))
        .collect()
}

#[test]
fn test_header_spans_fourteen_pages() {
    let lut = compile(records(), &config(&W, PageSizeMode::Fixed(9))).expect("compiles");

    // Two slots fit after the child count on the first page, three on each
    // later one: 41 slots with the sentinel take 14 pages. Each leaf group
    // takes one, plus the global page.
    assert_eq!(lut.page_count, 55);
    assert_eq!(lut.bytes.len(), 55 * 9);

    let root = &lut.bytes[9..18];
    assert_eq!(root[0], 40);
    assert_eq!(&root[1..7], &[0, 14, 0, 1, 15, 0]);

    assert_all_reachable(&lut.bytes, &records());
}

#[test]
fn test_sentinel_carries_total_pages() {
    let lut = compile(records(), &config(&W, PageSizeMode::Fixed(9))).expect("compiles");
    // Slot 40 is the third slot on the last header page.
    let last_header = &lut.bytes[14 * 9..15 * 9];
    assert_eq!(&last_header[6..9], &[0xFF, 54, 0]);
}

#[test]
fn test_auto_is_never_worse() {
    let lut = compile(records(), &config(&W, PageSizeMode::Auto)).expect("compiles");
    assert!(lut.page_count <= 55);
    assert_all_reachable(&lut.bytes, &records());
}
