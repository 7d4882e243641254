//! Headless mode driven through the binary.

use super::common::{run_headless, run_mock};
use std::io::Write;

#[test]
fn test_general_statistics_on_startup() {
    let (code, stdout, _) = run_mock("key:esc", &[]);

    assert_eq!(code, 0, "Expected exit code 0");
    assert!(stdout.contains("Match Masters Analysis"));
    assert!(stdout.contains("Top 10 Cities by Number of Users"));
    assert!(stdout.contains("Events: 1 executed"));
}

#[test]
fn test_user_lookup_json() {
    let (code, stdout, _) = run_mock(
        "key:f2,type:u-1001,key:enter,assert:contains:DragonSlayer",
        &["--output", "json"],
    );

    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["state"]["tab"], "Events");
    assert_eq!(parsed["state"]["purchase_rows"], 3);
    assert_eq!(parsed["assertions"]["passed"], 1);
    assert_eq!(parsed["assertions"]["failed"], 0);
}

#[test]
fn test_unknown_user_message() {
    let (code, stdout, _) = run_mock(
        "key:f2,type:nobody,key:enter,assert:contains:No purchase data found for this user ID.",
        &[],
    );
    assert_eq!(code, 0, "stdout: {stdout}");
}

#[test]
fn test_invalid_user_id_is_reported_inline() {
    let (code, stdout, _) = run_mock(
        "key:f2,type:bad/id,key:enter,assert:contains:User ID may only contain",
        &["--output", "json"],
    );

    assert_eq!(code, 0, "stdout: {stdout}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["state"]["input_error"].is_string());
    assert_eq!(parsed["state"]["events"], "idle");
}

#[test]
fn test_startup_user_id() {
    let (code, stdout, _) = run_mock(
        "assert:state:tab=Events,assert:state:purchase_rows=3",
        &["--user-id", "u-1001"],
    );
    assert_eq!(code, 0, "stdout: {stdout}");
    assert!(stdout.contains("Purchase Data for User: DragonSlayer"));
}

#[test]
fn test_assertion_failure_exit_code() {
    let (code, stdout, _) = run_mock("assert:contains:goodbye", &["--output", "json"]);

    assert_eq!(code, 1, "Should exit with code 1 on assertion failure");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["assertions"]["passed"], 0);
    assert_eq!(parsed["assertions"]["failed"], 1);
}

#[test]
fn test_custom_size() {
    let (code, stdout, _) = run_mock("key:esc", &["--size", "80x24"]);

    assert_eq!(code, 0);
    let screen_lines = stdout.lines().take_while(|l| !l.starts_with("Events:"));
    assert!(screen_lines.count() <= 25);
    assert!(stdout.lines().all(|l| l.chars().count() <= 80));
}

#[test]
fn test_invalid_size_is_rejected() {
    let (code, _, stderr) = run_mock("key:esc", &["--size", "0x10"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Configuration Error") || stderr.contains("Invalid Input"));
}

#[test]
fn test_headless_requires_events() {
    let (code, _, stderr) = run_headless(&["--headless", "--mock-db"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("requires --events or --script"));
}

#[test]
fn test_invalid_date_range_fails_before_running() {
    let (code, _, stderr) = run_mock(
        "key:esc",
        &["--start", "2024-06-30", "--end", "2024-06-01"],
    );
    assert_eq!(code, 1);
    assert!(!stderr.is_empty());
}

#[test]
fn test_script_file_and_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("lookup.script");
    let output_path = dir.path().join("result.txt");

    let mut script = std::fs::File::create(&script_path).unwrap();
    writeln!(script, "# look up a known player").unwrap();
    writeln!(script, "key:f2").unwrap();
    writeln!(script, "type:u-1003").unwrap();
    writeln!(script, "key:enter").unwrap();
    writeln!(script, "assert:contains:GemHunter").unwrap();

    let (code, stdout, _) = run_headless(&[
        "--headless",
        "--mock-db",
        "--script",
        script_path.to_str().unwrap(),
        "--output-file",
        output_path.to_str().unwrap(),
    ]);

    assert_eq!(code, 1, "GemHunter has no purchases so the assertion fails");
    assert!(stdout.is_empty());
    let output = std::fs::read_to_string(&output_path).unwrap();
    assert!(output.contains("No purchase data found for this user ID."));
    assert!(output.contains("Assertions: 0 passed, 1 failed"));
}

#[test]
fn test_frames_output() {
    let (code, stdout, _) = run_mock("key:f2,snapshot:events", &["--output", "frames"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("=== FRAME 0 (initial) ==="));
    assert!(stdout.contains("Enter User ID"));
    assert!(stdout.contains("Total: 3 frames"));
}
