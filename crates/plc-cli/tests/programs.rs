use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap().parent().unwrap().to_path_buf()
}

fn write_program(dir: &tempfile::TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("program.plc");
    std::fs::write(&path, source).unwrap();
    path
}

#[test]
fn runs_factorial_demo() {
    let root = workspace_root();
    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(root.join("demos/factorial.plc"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("fact(5) = 120"));
}

#[test]
fn runs_fizzbuzz_demo() {
    let root = workspace_root();
    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(root.join("demos/fizzbuzz.plc"));
    cmd.assert().success().stdout(predicate::str::diff(
        "1\n2\nFizz\n4\nBuzz\nFizz\n7\n8\nFizz\nBuzz\n11\nFizz\n13\n14\nFizzBuzz\n",
    ));
}

#[test]
fn runs_bases_demo() {
    let root = workspace_root();
    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(root.join("demos/bases.plc"));
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("1010\n12\n"));
}

#[test]
fn print_concatenates_mixed_operands() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = write_program(
        &tmp_dir,
        "FUN main(): Integer DO LET s = \"a\" + 1; print(s); RETURN 0; END\n",
    );

    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(path);
    cmd.assert().success().stdout(predicate::str::diff("a1\n"));
}

#[test]
fn exit_code_is_mains_return_value() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = write_program(&tmp_dir, "FUN main(): Integer DO RETURN 3; END\n");

    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(path);
    cmd.assert().code(3);
}

#[test]
fn parse_error_is_nonzero() {
    let bad = "FUN main(\n"; // malformed on purpose
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = write_program(&tmp_dir, bad);

    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn analysis_error_names_the_missing_entry_point() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = write_program(&tmp_dir, "FUN helper(): Integer DO RETURN 0; END\n");

    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Analysis error"))
        .stderr(predicate::str::contains("main/0"));
}

#[test]
fn runtime_error_is_reported() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = write_program(&tmp_dir, "FUN main(): Integer DO RETURN 1 / 0; END\n");

    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg(path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Runtime error"))
        .stderr(predicate::str::contains("Division by zero"));
}

#[test]
fn missing_file_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("plc").unwrap();
    cmd.arg("no-such-file.plc");
    cmd.assert().code(2);
}
