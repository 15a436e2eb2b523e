use serial_test::serial;
use std::process::Command;

fn processor() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_forge-processor"));
    command
        .current_dir(std::env::temp_dir())
        .env_remove("CONNECTION_STRING")
        .env("RUST_LOG", "error");

    command
}

/// The processor exits with an error code when the database is unreachable
#[test]
#[serial]
fn test_application_exits_on_connection_failure() {
    let output = processor()
        .env(
            "CONNECTION_STRING",
            "host=127.0.0.1 port=1 user=postgres password=wrong dbname=nonexistent connect_timeout=2"
        )
        .output()
        .expect("Failed to execute processor");

    assert!(!output.status.success(), "Process should fail with invalid connection");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to connect to database"),
        "Should log connection error, got: {}",
        stderr
    );
}

#[test]
#[serial]
fn test_application_exits_on_missing_connection_string() {
    let output = processor().output().expect("Failed to execute processor");

    assert!(!output.status.success(), "Process should fail without a connection string");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--connection-string"), "got: {}", stderr);
}

#[test]
#[serial]
fn test_application_rejects_invalid_offset() {
    let output = processor()
        .args(["--connection-string", "host=127.0.0.1", "--utc-offset", "+31:00"])
        .output()
        .expect("Failed to execute processor");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid UTC offset"));
}
