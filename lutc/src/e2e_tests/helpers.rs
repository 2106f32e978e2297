//! Common helpers for end-to-end tests.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::LutcCli;
use crate::layout::LutReader;
use crate::record::{Record, record_to_json};

/// Write each record to `rec_<i>.json` in `dir`, returning the paths in order.
pub fn write_inputs(dir: &Path, records: &[Record]) -> Vec<PathBuf> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let path = dir.join(format!("rec_{i}.json"));
            let json = record_to_json(record).expect("record serializes");
            std::fs::write(&path, json).expect("write input");
            path
        })
        .collect()
}

/// Parse a command line, prefixing the program name.
pub fn cli(args: &[&str]) -> LutcCli {
    LutcCli::try_parse_from(std::iter::once("lutc").chain(args.iter().copied()))
        .expect("arguments parse")
}

/// Paths as command-line arguments.
pub fn args(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

/// Names of the files in `dir`, sorted.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("list dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Look every record up in `bytes` and check payload and checksum.
pub fn assert_all_reachable(bytes: &[u8], records: &[Record]) {
    let reader = LutReader::open(bytes).expect("table opens");
    for record in records {
        let entry = reader
            .lookup(&record.keys, record.payload.len())
            .expect("lookup reads")
            .unwrap_or_else(|| panic!("record {:?} not found", record.keys));
        assert_eq!(entry.payload, record.payload.as_slice(), "{:?}", record.keys);
        assert_eq!(entry.checksum, record.checksum, "{:?}", record.keys);
    }
}
