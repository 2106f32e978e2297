//! Full command-line runs that link a table.

use crate::CompileError;
use crate::cli::run;
use crate::config::PageSizeMode;
use crate::e2e_tests::helpers::*;
use crate::testing::{RecordGen, config, record};
use crate::compile;

#[test]
fn test_run_writes_compiled_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let widths = [1, 2];
    let records = RecordGen::new(21, &widths).records(40);
    let inputs = write_inputs(dir.path(), &records);
    let out = dir.path().join("table.bin");

    let mut argv = vec!["-w".to_string(), "1,2".to_string(), "-o".to_string(), out.display().to_string()];
    argv.extend(args(&inputs));
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let written = run(&cli(&argv).run_config().expect("valid config")).expect("runs");

    assert_eq!(written, vec![out.clone()]);
    let expected = compile(records, &config(&widths, PageSizeMode::Auto)).expect("compiles");
    assert_eq!(std::fs::read(&out).expect("read"), expected.bytes);
}

#[test]
fn test_run_with_fixed_size() {
    let dir = tempfile::tempdir().expect("tempdir");
    let widths = [4, 4];
    let records = vec![
        record(&widths, &[1, 0x0A], &[0x11]),
        record(&widths, &[1, 0x0B], &[0x22]),
        record(&widths, &[2, 0x0A], &[0x33]),
    ];
    let inputs = write_inputs(dir.path(), &records);
    let out = dir.path().join("lut.bin");

    let mut argv = vec!["-s".to_string(), "64".to_string(), "-o".to_string(), out.display().to_string()];
    argv.extend(args(&inputs));
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    run(&cli(&argv).run_config().expect("valid config")).expect("runs");

    let bytes = std::fs::read(&out).expect("read");
    assert_eq!(bytes.len(), 4 * 64);
    assert_eq!(&bytes[..6], &[1, 0, 64, 0, 4, 4]);
    assert_all_reachable(&bytes, &records);
}

#[test]
fn test_failed_run_keeps_previous_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("lut.bin");
    std::fs::write(&out, b"previous").expect("seed");

    let widths = [1, 1];
    let records = vec![record(&widths, &[1, 1], &[0]), record(&widths, &[1, 2], &[0, 0])];
    let inputs = write_inputs(dir.path(), &records);
    let before = dir_listing(dir.path());

    let mut argv = vec!["-w".to_string(), "1,1".to_string(), "-o".to_string(), out.display().to_string()];
    argv.extend(args(&inputs));
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let err = run(&cli(&argv).run_config().expect("valid config")).expect_err("mixed payloads");

    assert!(matches!(err, CompileError::PayloadSizeMismatch(_)));
    assert_eq!(std::fs::read(&out).expect("read"), b"previous");
    assert_eq!(dir_listing(dir.path()), before);
}

#[test]
fn test_missing_input_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.json");
    let out = dir.path().join("lut.bin");

    let argv = ["-o".to_string(), out.display().to_string(), missing.display().to_string()];
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let err = run(&cli(&argv).run_config().expect("valid config")).expect_err("missing input");

    assert!(matches!(err, CompileError::Io { ref path, .. } if *path == missing));
    assert!(!out.exists());
}

#[test]
fn test_invalid_json_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("broken.json");
    std::fs::write(&input, "{ not json").expect("write");

    let argv = ["-o".to_string(), dir.path().join("lut.bin").display().to_string(), input.display().to_string()];
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let err = run(&cli(&argv).run_config().expect("valid config")).expect_err("bad json");
    assert!(matches!(err, CompileError::InvalidRecord { ref path, .. } if *path == input));
}
