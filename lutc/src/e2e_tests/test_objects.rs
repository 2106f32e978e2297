//! Compiling inputs to objects with -c, then linking the objects.

use crate::CompileError;
use crate::cli::run;
use crate::config::ConfigError;
use crate::e2e_tests::helpers::*;
use crate::record::{OBJECT_VERSION, decode_object, encode_object};
use crate::testing::{RecordGen, record};

const W: [usize; 2] = [2, 2];

fn run_args(argv: &[String]) -> Result<Vec<std::path::PathBuf>, CompileError> {
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let config = cli(&argv).run_config()?;
    run(&config)
}

#[test]
fn test_compile_only_writes_one_object_per_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let records = RecordGen::new(3, &W).records(5);
    let inputs = write_inputs(dir.path(), &records);

    let mut argv = vec!["-c".to_string(), "-w".to_string(), "2,2".to_string()];
    argv.extend(args(&inputs));
    let written = run_args(&argv).expect("compiles");

    assert_eq!(written.len(), records.len());
    for ((path, input), record) in written.iter().zip(&inputs).zip(&records) {
        assert_eq!(*path, input.with_extension("lo"));
        let bytes = std::fs::read(path).expect("read object");
        assert_eq!(bytes[0], OBJECT_VERSION);
        assert_eq!(decode_object(&bytes).as_ref(), Ok(record));
    }
}

#[test]
fn test_linking_objects_matches_linking_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let records = RecordGen::new(11, &W).records(30);
    let inputs = write_inputs(dir.path(), &records);

    let mut compile_argv = vec!["-c".to_string(), "-w".to_string(), "2,2".to_string()];
    compile_argv.extend(args(&inputs));
    let objects = run_args(&compile_argv).expect("compiles objects");

    let from_json = dir.path().join("from_json.bin");
    let mut argv = vec!["-w".into(), "2,2".into(), "-o".into(), from_json.display().to_string()];
    argv.extend(args(&inputs));
    run_args(&argv).expect("links json");

    let from_objects = dir.path().join("from_objects.bin");
    let mut argv = vec!["-w".into(), "2,2".into(), "-o".into(), from_objects.display().to_string()];
    argv.extend(args(&objects));
    run_args(&argv).expect("links objects");

    let json_table = std::fs::read(&from_json).expect("read");
    assert_eq!(json_table, std::fs::read(&from_objects).expect("read"));
    assert_all_reachable(&json_table, &records);
}

#[test]
fn test_single_object_with_explicit_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rec = record(&W, &[1, 2], &[3, 4]);
    let inputs = write_inputs(dir.path(), std::slice::from_ref(&rec));
    let out = dir.path().join("custom.lo");

    let argv = vec![
        "-c".to_string(),
        "-w".to_string(),
        "2,2".to_string(),
        "-o".to_string(),
        out.display().to_string(),
        inputs[0].display().to_string(),
    ];
    assert_eq!(run_args(&argv).expect("compiles"), vec![out.clone()]);
    assert_eq!(
        std::fs::read(&out).expect("read"),
        encode_object(&rec).expect("encodes")
    );
    assert!(!inputs[0].with_extension("lo").exists());
}

#[test]
fn test_explicit_output_with_several_objects_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let records = RecordGen::new(5, &W).records(2);
    let inputs = write_inputs(dir.path(), &records);
    let before = dir_listing(dir.path());

    let mut argv = vec!["-c".to_string(), "-o".to_string(), "x.lo".to_string()];
    argv.extend(args(&inputs));
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    assert_eq!(
        cli(&argv).run_config(),
        Err(ConfigError::AmbiguousOutput { inputs: 2 })
    );
    assert_eq!(dir_listing(dir.path()), before);
}

#[test]
fn test_bad_object_version_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut bytes = encode_object(&record(&W, &[1, 1], &[0])).expect("encodes");
    bytes[0] = OBJECT_VERSION + 1;
    let bad = dir.path().join("bad.lo");
    std::fs::write(&bad, &bytes).expect("write");
    let out = dir.path().join("lut.bin");

    let argv = vec![
        "-w".to_string(),
        "2,2".to_string(),
        "-o".to_string(),
        out.display().to_string(),
        bad.display().to_string(),
    ];
    let err = run_args(&argv).expect_err("version rejected");
    assert!(
        matches!(
            &err,
            CompileError::UnsupportedObjectVersion { path, version }
                if *path == bad && *version == OBJECT_VERSION + 1
        ),
        "{err}"
    );
    assert!(!out.exists());
}

#[test]
fn test_shape_error_writes_no_objects() {
    let dir = tempfile::tempdir().expect("tempdir");
    let records = vec![record(&W, &[1, 1], &[0]), record(&[2, 4], &[1, 2], &[0])];
    let inputs = write_inputs(dir.path(), &records);
    let before = dir_listing(dir.path());

    let mut argv = vec!["-c".to_string(), "-w".to_string(), "2,2".to_string()];
    argv.extend(args(&inputs));
    let err = run_args(&argv).expect_err("shape mismatch");
    let CompileError::KeyWidthMismatch(mismatches) = &err else {
        panic!("expected KeyWidthMismatch, got {err}");
    };
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].index, 1);
    assert_eq!(mismatches[0].path.as_ref(), Some(&inputs[1]));
    assert!(err.to_string().contains(&inputs[1].display().to_string()));
    assert_eq!(dir_listing(dir.path()), before);
}

#[test]
fn test_every_bad_object_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = write_inputs(dir.path(), &[record(&W, &[1, 1], &[0])]);
    let mut paths = Vec::new();
    for (name, version) in [("a.lo", 9), ("b.lo", 7)] {
        let mut bytes = encode_object(&record(&W, &[2, 1], &[0])).expect("encodes");
        bytes[0] = version;
        let path = dir.path().join(name);
        std::fs::write(&path, &bytes).expect("write");
        paths.push(path);
    }
    let out = dir.path().join("lut.bin");

    let mut argv = vec!["-w".to_string(), "2,2".to_string(), "-o".to_string(), out.display().to_string()];
    argv.extend(args(&[paths[0].clone(), good[0].clone(), paths[1].clone()]));
    let err = run_args(&argv).expect_err("both objects rejected");

    let CompileError::Inputs(failures) = &err else {
        panic!("expected every failing input, got {err}");
    };
    assert_eq!(failures.len(), 2);
    let message = err.to_string();
    assert!(message.contains(&format!("{} has unsupported object version 9", paths[0].display())));
    assert!(message.contains(&format!("{} has unsupported object version 7", paths[1].display())));
    assert!(!out.exists());
}
