//! Tables with index levels above the structure level.

use crate::config::PageSizeMode;
use crate::e2e_tests::helpers::*;
use crate::layout::LutReader;
use crate::testing::{RecordGen, config, record};
use crate::{Key, compile};

const W: [usize; 3] = [1, 1, 1];

fn records() -> Vec<crate::Record> {
    vec![
        record(&W, &[1, 1, 1], &[7]),
        record(&W, &[1, 2, 1], &[8]),
        record(&W, &[2, 1, 1], &[9]),
    ]
}

#[test]
fn test_one_index_level_bytes() {
    let lut = compile(records(), &config(&W, PageSizeMode::Fixed(16))).expect("compiles");

    let page = |prefix: &[u8], fill: u8| {
        let mut bytes = vec![fill; 16];
        bytes[..prefix.len()].copy_from_slice(prefix);
        bytes
    };
    let expected = [
        page(&[1, 1, 16, 0, 1, 1, 1], 0),
        // Root index: key 1 at page 1, key 2 at page 4, six pages in total.
        page(&[2, 1, 1, 0, 2, 4, 0, 0xFF, 6, 0], 0xFF),
        // Index 1, relative to its own first page.
        page(&[2, 1, 1, 0, 2, 2, 0, 0xFF, 3, 0], 0xFF),
        page(&[1, 7, 0xA2], 0),
        page(&[1, 8, 0xAD], 0),
        page(&[1, 1, 1, 0, 0xFF, 2, 0], 0xFF),
        page(&[1, 9, 0xAC], 0),
    ]
    .concat();

    assert_eq!(lut.page_count, 7);
    assert_eq!(lut.bytes, expected);
}

#[test]
fn test_header_reports_indirection() {
    let lut = compile(records(), &config(&W, PageSizeMode::Auto)).expect("compiles");
    let reader = LutReader::open(&lut.bytes).expect("opens");
    assert_eq!(reader.header().indirection(), 1);
    assert_eq!(reader.header().widths, vec![1, 1, 1]);
    assert_all_reachable(&lut.bytes, &records());
}

#[test]
fn test_missing_index_key_is_absent() {
    let lut = compile(records(), &config(&W, PageSizeMode::Auto)).expect("compiles");
    let reader = LutReader::open(&lut.bytes).expect("opens");
    let keys = [Key::from_uint(3, 1), Key::from_uint(1, 1), Key::from_uint(1, 1)];
    assert_eq!(reader.lookup(&keys, 1), Ok(None));
    let keys = [Key::from_uint(2, 1), Key::from_uint(2, 1), Key::from_uint(1, 1)];
    assert_eq!(reader.lookup(&keys, 1), Ok(None));
}

#[test]
fn test_two_index_levels_random() {
    let widths = [2, 1, 1, 2];
    for seed in 0..4 {
        let records = RecordGen::new(seed, &widths).records(150);
        let lut = compile(records.clone(), &config(&widths, PageSizeMode::Auto))
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        let reader = LutReader::open(&lut.bytes).expect("opens");
        assert_eq!(reader.header().indirection(), 2);
        assert_all_reachable(&lut.bytes, &records);
    }
}
