//! Two records with the same full key path: nothing is written.

use crate::CompileError;
use crate::cli::run;
use crate::config::PageSizeMode;
use crate::e2e_tests::helpers::*;
use crate::testing::{config, record};
use crate::{compile, duplicates::format_key_path};

const W: [usize; 2] = [4, 4];

#[test]
fn test_duplicate_path_fails_compile() {
    let records = vec![
        record(&W, &[1, 0x0A], &[0x11]),
        record(&W, &[1, 0x0A], &[0x22]),
        record(&W, &[2, 0x0A], &[0x33]),
    ];
    let err = compile(records, &config(&W, PageSizeMode::Auto)).expect_err("duplicate");
    let CompileError::DuplicateKey(paths) = &err else {
        panic!("expected DuplicateKey, got {err}");
    };
    let listed: Vec<String> = paths.iter().map(|p| format_key_path(p)).collect();
    assert_eq!(listed, vec!["[ 01h 00h 00h 00h 0ah 00h 00h 00h ]"]);
    assert!(err.to_string().contains("[ 01h 00h 00h 00h 0ah 00h 00h 00h ]"));
}

#[test]
fn test_duplicate_path_writes_no_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let records = vec![
        record(&W, &[7, 1], &[1]),
        record(&W, &[7, 2], &[2]),
        record(&W, &[7, 1], &[3]),
    ];
    let inputs = write_inputs(dir.path(), &records);
    let before = dir_listing(dir.path());

    let out = dir.path().join("lut.bin");
    let mut argv = vec!["-o".to_string(), out.display().to_string()];
    argv.extend(args(&inputs));
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let config = cli(&argv).run_config().expect("valid config");

    assert!(matches!(run(&config), Err(CompileError::DuplicateKey(_))));
    assert!(!out.exists());
    assert_eq!(dir_listing(dir.path()), before);
}

#[test]
fn test_duplicate_object_paths_are_not_checked() {
    // Objects are compiled one record at a time; collisions surface at link.
    let records = vec![record(&W, &[1, 1], &[1]), record(&W, &[1, 1], &[2])];
    let objects = crate::compile_objects(&records, &config(&W, PageSizeMode::Auto).shape)
        .expect("encodes");
    assert_eq!(objects.len(), 2);
}
