//! Thousands of structure nodes under one root header.

use std::time::{Duration, Instant};

use crate::compile;
use crate::config::PageSizeMode;
use crate::e2e_tests::helpers::*;
use crate::testing::{config, record};

const W: [usize; 2] = [2, 2];

/// Debug builds included; the page size search must not scale with the
/// number of structures times the search range.
const BUDGET: Duration = Duration::from_secs(15);

fn records() -> Vec<crate::Record> {
    (0..3000)
        .map(|k| record(&W, &[k, 1], &[u8::try_from(k % 251).expect("small")]))
        .collect()
}

#[test]
fn test_auto_and_fixed_within_budget() {
    let records = records();

    let started = Instant::now();
    let auto = compile(records.clone(), &config(&W, PageSizeMode::Auto)).expect("compiles");
    let fixed = compile(records.clone(), &config(&W, PageSizeMode::Fixed(512))).expect("compiles");
    let elapsed = started.elapsed();

    assert!(elapsed < BUDGET, "took {elapsed:?}");
    assert!(auto.page_count <= fixed.page_count);
    assert_all_reachable(&auto.bytes, &records);
    assert_all_reachable(&fixed.bytes, &records);
}
