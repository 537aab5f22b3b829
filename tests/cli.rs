#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Mutex;

// One bacpipe process at a time, see tests/pipeline.rs
static SERIAL: Mutex<()> = Mutex::new(());

fn bacpipe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bacpipe"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_reads(dir: &Path) -> (String, String) {
    let fq1 = dir.join("ISO1_R1.fastq");
    let fq2 = dir.join("ISO1_R2.fastq");
    fs::write(&fq1, "@r\nACGT\n+\nIIII\n").unwrap();
    fs::write(&fq2, "@r\nTGCA\n+\nIIII\n").unwrap();
    (fq1.display().to_string(), fq2.display().to_string())
}

fn write_tool(env_root: &Path, env: &str, program: &str, body: &str) {
    let bin = env_root.join(env).join("bin");
    fs::create_dir_all(&bin).unwrap();
    let path = bin.join(program);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_config_error_with_file_logging_creates_nothing() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    for mode in ["both", "path"] {
        let output = bacpipe(&[
            "-1", "/nonexistent/S_R1.fq",
            "-2", "/nonexistent/S_R2.fq",
            "-o", out.to_str().unwrap(),
            "--log-mode", mode,
        ]);
        assert_eq!(output.status.code(), Some(2), "mode {}", mode);
        assert!(!out.exists(), "mode {}", mode);
        assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
    }
}

#[test]
fn test_dry_run_with_file_logging_creates_nothing() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let (fq1, fq2) = write_reads(dir.path());
    let out = dir.path().join("out");

    let output = bacpipe(&[
        "-1", &fq1, "-2", &fq2,
        "-o", out.to_str().unwrap(),
        "--dry-run", "--log-mode", "path",
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert!(!out.exists());
    // Lines meant for the file end up on the terminal instead
    assert!(String::from_utf8_lossy(&output.stderr).contains("fastp"));
}

#[test]
fn test_missing_tool_with_file_logging_is_reported_on_terminal() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let (fq1, fq2) = write_reads(dir.path());
    let out = dir.path().join("out");
    let envs = dir.path().join("envs");

    let output = bacpipe(&[
        "-1", &fq1, "-2", &fq2,
        "-o", out.to_str().unwrap(),
        "--env-root", envs.to_str().unwrap(),
        "--log-mode", "path",
    ]);

    assert_eq!(output.status.code(), Some(4));
    assert!(!out.exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("'fastp'"));
}

#[test]
fn test_step_failure_with_file_logging() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let (fq1, fq2) = write_reads(dir.path());
    let out = dir.path().join("out");
    let envs = dir.path().join("envs");

    write_tool(
        &envs,
        "fastp",
        "fastp",
        "while [ $# -gt 0 ]; do case \"$1\" in -o|-O) echo r > \"$2\"; shift ;; esac; shift; done\n",
    );
    write_tool(&envs, "shovill", "shovill", "echo 'spades died' >&2\nexit 7\n");

    let output = bacpipe(&[
        "-1", &fq1, "-2", &fq2,
        "-o", out.to_str().unwrap(),
        "--env-root", envs.to_str().unwrap(),
        "--log-mode", "path",
    ]);

    assert_eq!(output.status.code(), Some(13));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("assemble"));

    // Lines logged during preflight were held and written once the file was opened
    let log = fs::read_to_string(out.join("bacpipe.log")).unwrap();
    assert!(log.contains("Found fastp"));
    assert!(log.contains("spades died"));
}
