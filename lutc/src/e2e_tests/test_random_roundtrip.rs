//! Seeded record sets compiled at several page sizes and read back.

use std::collections::BTreeSet;

use crate::config::PageSizeMode;
use crate::e2e_tests::helpers::*;
use crate::layout::LutReader;
use crate::testing::{RecordGen, config};
use crate::{Key, Record, compile};

const SHAPES: [&[usize]; 4] = [&[4, 4], &[1, 2], &[2, 1, 2], &[1, 1, 1, 2]];

/// A path in the same structure group as `record` that no record uses.
fn absent_sibling(record: &Record, paths: &BTreeSet<Vec<u8>>) -> Vec<Key> {
    let width = record.keys.last().map_or(1, Key::width);
    let mut keys = record.keys.clone();
    for value in 0..=u64::from(u8::MAX) {
        if let Some(last) = keys.last_mut() {
            *last = Key::from_uint(value, width);
        }
        let path: Vec<u8> = keys.iter().flat_map(|k| k.as_bytes().to_vec()).collect();
        if !paths.contains(&path) {
            return keys;
        }
    }
    panic!("no free discriminator next to {:?}", record.keys);
}

#[test]
fn test_every_record_reachable_at_any_valid_size() {
    for widths in SHAPES {
        for seed in 0..6 {
            let records = RecordGen::new(seed, widths).records(120);
            let auto = compile(records.clone(), &config(widths, PageSizeMode::Auto))
                .unwrap_or_else(|e| panic!("{widths:?} seed {seed}: {e}"));
            assert_all_reachable(&auto.bytes, &records);

            for size in [auto.page_size, auto.page_size + 13, 1024] {
                let fixed = compile(records.clone(), &config(widths, PageSizeMode::Fixed(size)))
                    .unwrap_or_else(|e| panic!("{widths:?} seed {seed} size {size}: {e}"));
                assert!(fixed.page_count >= auto.page_count, "auto is optimal");
                assert_all_reachable(&fixed.bytes, &records);
            }

            let again = compile(records.clone(), &config(widths, PageSizeMode::Fixed(auto.page_size)))
                .expect("compiles");
            assert_eq!(again, auto, "same size gives the same table");
        }
    }
}

#[test]
fn test_absent_keys_are_not_found() {
    for widths in SHAPES {
        let records = RecordGen::new(99, widths).records(60);
        let paths: BTreeSet<Vec<u8>> = records.iter().map(Record::full_path).collect();
        let lut = compile(records.clone(), &config(widths, PageSizeMode::Auto)).expect("compiles");
        let reader = LutReader::open(&lut.bytes).expect("opens");

        for record in records.iter().take(10) {
            let keys = absent_sibling(record, &paths);
            assert_eq!(
                reader.lookup(&keys, record.payload.len()),
                Ok(None),
                "{widths:?} {keys:?}"
            );
        }
    }
}

#[test]
fn test_input_order_does_not_matter() {
    let widths = [2, 1, 2];
    let mut records = RecordGen::new(7, &widths).records(80);
    let forward = compile(records.clone(), &config(&widths, PageSizeMode::Auto)).expect("compiles");
    records.reverse();
    let backward = compile(records, &config(&widths, PageSizeMode::Auto)).expect("compiles");
    assert_eq!(forward, backward);
}
