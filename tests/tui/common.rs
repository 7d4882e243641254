//! Common test utilities for TUI tests.

use std::process::Command;

/// Runs match-dash with the given arguments.
///
/// Cargo builds the binary before integration tests run.
pub fn run_headless(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_match-dash"))
        .args(args)
        .env_remove("DATABASE_URL")
        .output()
        .expect("Failed to execute command");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}

/// Runs a script against the sample warehouse.
pub fn run_mock(events: &str, extra: &[&str]) -> (i32, String, String) {
    let mut args = vec!["--headless", "--mock-db", "--events", events];
    args.extend_from_slice(extra);
    run_headless(&args)
}
