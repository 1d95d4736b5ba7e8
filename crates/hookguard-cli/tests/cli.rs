use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// A well-formed hook: guarded loop, accepted in strict mode.
const VALID_HOOK: &str = r#"(module
  (import "env" "_g" (func $g (param i32 i32) (result i32)))
  (func $hook (param i32) (result i64)
    (loop (drop (call $g (i32.const 1) (i32.const 5))))
    (i64.const 0))
  (export "hook" (func $hook)))"#;

/// A hook whose loop carries no guard call.
const UNGUARDED_HOOK: &str = r#"(module
  (import "env" "_g" (func $g (param i32 i32) (result i32)))
  (func $hook (param i32) (result i64)
    (loop (nop))
    (i64.const 0))
  (export "hook" (func $hook)))"#;

/// Accepted leniently but strict-rejected: a helper type with no result.
const ZERO_RESULT_TYPE_HOOK: &str = r#"(module
  (import "env" "_g" (func $g (param i32 i32) (result i32)))
  (func $helper)
  (func $hook (param i32) (result i64)
    (i64.const 0))
  (export "hook" (func $hook)))"#;

/// Strips custom sections (id 0) that `wat` attaches for debug names; the
/// fixtures carry no semantic content there, but strict mode rejects any
/// custom section outright.
fn strip_custom_sections(bytes: Vec<u8>) -> Vec<u8> {
    let mut out = bytes[..8].to_vec();
    let mut pos = 8;
    while pos < bytes.len() {
        let id = bytes[pos];
        let mut len_pos = pos + 1;
        let mut len: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = bytes[len_pos];
            len_pos += 1;
            len |= u64::from(byte & 0x7F) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }
        let payload_end = len_pos + len as usize;
        if id != 0 {
            out.extend_from_slice(&bytes[pos..payload_end]);
        }
        pos = payload_end;
    }
    out
}

fn compile(wat_src: &str) -> Vec<u8> {
    strip_custom_sections(wat::parse_str(wat_src).expect("test module should assemble"))
}

fn wasm_file(wat_src: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(&compile(wat_src)).expect("write wasm");
    file.flush().expect("flush");
    file
}

fn hookguard_cmd() -> Command {
    Command::cargo_bin("hookguard-cli").expect("binary should be built")
}

#[test]
fn valid_hook_exits_0_with_accept_summary() {
    let file = wasm_file(VALID_HOOK);
    hookguard_cmd()
        .arg(file.path())
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("ACCEPT"))
        .stdout(predicate::str::contains("hook instruction ceiling 27"));
}

#[test]
fn unguarded_hook_exits_1_with_reject_summary() {
    let file = wasm_file(UNGUARDED_HOOK);
    hookguard_cmd()
        .arg(file.path())
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("REJECT"))
        .stdout(predicate::str::contains("GUARD_MISSING"));
}

#[test]
fn garbage_input_exits_1() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"not wasm at all").unwrap();
    file.flush().unwrap();

    hookguard_cmd()
        .arg(file.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("WASM_BAD_MAGIC"));
}

#[test]
fn validation_is_strict_by_default() {
    let file = wasm_file(ZERO_RESULT_TYPE_HOOK);
    hookguard_cmd()
        .arg(file.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FUNC_RETURN_COUNT"));
}

#[test]
fn stdin_is_the_default_input() {
    hookguard_cmd()
        .write_stdin(compile(VALID_HOOK))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("ACCEPT <stdin>"));
}

#[test]
fn dash_reads_stdin_too() {
    hookguard_cmd()
        .arg("-")
        .write_stdin(compile(UNGUARDED_HOOK))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("REJECT <stdin>"));
}

#[test]
fn json_output_is_valid_and_complete() {
    let file = wasm_file(VALID_HOOK);
    let output = hookguard_cmd()
        .arg(file.path())
        .arg("--format")
        .arg("json")
        .output()
        .expect("command should run");

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");

    assert!(parsed.get("schema_version").is_some());
    assert!(parsed.get("tool").is_some());
    assert!(parsed.get("module").is_some());
    assert!(parsed.get("outcome").is_some());
    assert!(parsed.get("events").is_some());
    assert_eq!(parsed["outcome"]["accepted"], true);
    assert_eq!(parsed["outcome"]["exit_code"], 0);
    assert_eq!(parsed["outcome"]["ceilings"]["hook"], 27);
    assert_eq!(parsed["outcome"]["ceilings"]["cbak"], 0);
}

#[test]
fn json_rejection_names_the_code() {
    let file = wasm_file(UNGUARDED_HOOK);
    let output = hookguard_cmd()
        .arg(file.path())
        .arg("--format")
        .arg("json")
        .output()
        .expect("command should run");

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["outcome"]["accepted"], false);
    assert_eq!(parsed["outcome"]["reject_code"], "GUARD_MISSING");

    let events = parsed["events"].as_array().unwrap();
    assert_eq!(events.last().unwrap()["code"], "GUARD_MISSING");
}

#[test]
fn account_flag_tags_log_events() {
    let file = wasm_file(VALID_HOOK);
    let output = hookguard_cmd()
        .arg(file.path())
        .arg("--format")
        .arg("json")
        .arg("--account")
        .arg("rHookAcct")
        .output()
        .expect("command should run");

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let events = parsed["events"].as_array().unwrap();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e["account"] == "rHookAcct"));
}

#[test]
fn module_hash_is_sha256() {
    let file = wasm_file(VALID_HOOK);
    let output = hookguard_cmd()
        .arg(file.path())
        .arg("--format")
        .arg("json")
        .output()
        .expect("command should run");

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["module"]["hash"]["algorithm"], "sha256");
    assert_eq!(parsed["module"]["hash"]["value"].as_str().unwrap().len(), 64);
}

#[test]
fn out_flag_writes_to_file() {
    let file = wasm_file(VALID_HOOK);
    let out = NamedTempFile::new().expect("create temp file");

    hookguard_cmd()
        .arg(file.path())
        .arg("--format")
        .arg("json")
        .arg("--out")
        .arg(out.path())
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());

    let contents = std::fs::read_to_string(out.path()).expect("read output file");
    let parsed: serde_json::Value = serde_json::from_str(&contents).expect("file should be JSON");
    assert_eq!(parsed["outcome"]["accepted"], true);
}

#[test]
fn commit_flag_embeds_hash_in_report() {
    let file = wasm_file(VALID_HOOK);
    let output = hookguard_cmd()
        .arg(file.path())
        .arg("--format")
        .arg("json")
        .arg("--commit")
        .arg("abc123def456")
        .output()
        .expect("command should run");

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["tool"]["commit"], "abc123def456");
    assert_eq!(parsed["tool"]["name"], "hookguard-cli");
}

#[test]
fn nonexistent_file_fails() {
    hookguard_cmd()
        .arg("/tmp/does_not_exist_hookguard_test.wasm")
        .assert()
        .failure();
}

#[test]
fn invalid_format_flag_fails() {
    let file = wasm_file(VALID_HOOK);
    hookguard_cmd()
        .arg(file.path())
        .arg("--format")
        .arg("xml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn deterministic_json_across_runs() {
    let file = wasm_file(VALID_HOOK);

    let run = || {
        let output = hookguard_cmd()
            .arg(file.path())
            .arg("--format")
            .arg("json")
            .output()
            .expect("run");
        serde_json::from_slice::<serde_json::Value>(&output.stdout).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn help_flag_prints_usage() {
    hookguard_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Static guard validation"));
}

#[test]
fn version_flag_prints_version() {
    hookguard_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hookguard"));
}
