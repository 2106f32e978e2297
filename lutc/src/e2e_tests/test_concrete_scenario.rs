//! Three records, two structures, 4-byte keys, 64-byte pages: every byte of
//! the table is known.

use crate::compile;
use crate::config::PageSizeMode;
use crate::e2e_tests::helpers::*;
use crate::testing::{config, record};

const W: [usize; 2] = [4, 4];

fn records() -> Vec<crate::Record> {
    vec![
        record(&W, &[1, 0x0A], &[0x11]),
        record(&W, &[1, 0x0B], &[0x22]),
        record(&W, &[2, 0x0A], &[0x33]),
    ]
}

fn expected_table() -> Vec<u8> {
    let mut global = vec![0u8; 64];
    global[..6].copy_from_slice(&[1, 0, 64, 0, 4, 4]);

    let mut header = vec![0xFFu8; 64];
    header[..22].copy_from_slice(&[
        2, 0, 0xFF, 0xFF, // child count
        1, 0, 0, 0, 1, 0, // structure 1 at page 1
        2, 0, 0, 0, 2, 0, // structure 2 at page 2
        0xFF, 0xFF, 0xFF, 0xFF, 3, 0, // sentinel: 3 pages in total
    ]);

    // Checksums are payload ^ 0xA5.
    let mut group_1 = vec![0u8; 64];
    group_1[..12].copy_from_slice(&[0x0A, 0, 0, 0, 0x11, 0xB4, 0x0B, 0, 0, 0, 0x22, 0x87]);
    let mut group_2 = vec![0u8; 64];
    group_2[..6].copy_from_slice(&[0x0A, 0, 0, 0, 0x33, 0x96]);

    [global, header, group_1, group_2].concat()
}

#[test]
fn test_scenario_bytes_at_64() {
    let lut = compile(records(), &config(&W, PageSizeMode::Fixed(64))).expect("compiles");
    assert_eq!(lut.page_size, 64);
    assert_eq!(lut.page_count, 4);
    assert_eq!(lut.bytes, expected_table());
}

#[test]
fn test_scenario_independent_of_input_order() {
    let mut reversed = records();
    reversed.reverse();
    let lut = compile(reversed, &config(&W, PageSizeMode::Fixed(64))).expect("compiles");
    assert_eq!(lut.bytes, expected_table());
}

#[test]
fn test_scenario_auto_page_size() {
    let lut = compile(records(), &config(&W, PageSizeMode::Auto)).expect("compiles");
    // 22 bytes is the smallest page holding the whole root header.
    assert_eq!(lut.page_size, 22);
    assert_eq!(lut.page_count, 4);
    assert_all_reachable(&lut.bytes, &records());
}
