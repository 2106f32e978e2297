//! Record builders shared by unit and end-to-end tests.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{LutConfig, PageSizeMode};
use crate::record::{Key, KeyShape, Record};

/// Shape from a width list; panics on an invalid one.
pub fn shape(widths: &[usize]) -> KeyShape {
    KeyShape::new(widths.to_vec()).expect("valid test shape")
}

pub fn config(widths: &[usize], page_size: PageSizeMode) -> LutConfig {
    LutConfig::new(shape(widths), page_size)
}

/// A record whose keys are little-endian encodings of `keys`, one per width.
/// The checksum is the XOR of the payload so each record's is distinct enough
/// to catch mix-ups.
pub fn record(widths: &[usize], keys: &[u64], payload: &[u8]) -> Record {
    assert_eq!(widths.len(), keys.len(), "one key per level");
    Record::new(
        keys.iter()
            .zip(widths)
            .map(|(&k, &w)| Key::from_uint(k, w))
            .collect(),
        payload.to_vec(),
        payload.iter().fold(0xA5, |acc, b| acc ^ b),
    )
}

/// Generator of random record sets with pairwise-distinct key paths.
///
/// Structure keys avoid the all-0xFF sentinel, and every record under one
/// structure key carries the same payload length.
pub struct RecordGen {
    rng: StdRng,
    widths: Vec<usize>,
}

impl RecordGen {
    pub fn new(seed: u64, widths: &[usize]) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            widths: widths.to_vec(),
        }
    }

    /// Up to `count` records; fewer if the key space runs out.
    pub fn records(&mut self, count: usize) -> Vec<Record> {
        let levels = self.widths.len();
        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(count);

        for _ in 0..count * 4 {
            if records.len() == count {
                break;
            }
            let keys: Vec<Key> = (0..levels)
                .map(|level| self.key(level))
                .collect();
            let path: Vec<u8> = keys.iter().flat_map(|k| k.as_bytes().to_vec()).collect();
            if !seen.insert(path) {
                continue;
            }

            let prefix: Vec<u8> = keys[..levels - 1]
                .iter()
                .flat_map(|k| k.as_bytes().to_vec())
                .collect();
            let payload_len = payload_len_for(&prefix);
            let payload: Vec<u8> = (0..payload_len).map(|_| self.rng.random()).collect();
            let checksum = self.rng.random();
            records.push(Record::new(keys, payload, checksum));
        }
        records
    }

    /// A key from a small value range so paths share prefixes. The range
    /// never reaches the all-0xFF sentinel.
    fn key(&mut self, level: usize) -> Key {
        let width = self.widths[level];
        let span = if width == 1 { 0xFF } else { 24 };
        Key::from_uint(self.rng.random_range(0..span), width)
    }
}

/// Payload length derived from the structure path, 0..=5 bytes.
fn payload_len_for(prefix: &[u8]) -> usize {
    prefix.iter().map(|&b| usize::from(b)).sum::<usize>() % 6
}
