use std::process::Command;

fn jira_users() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jira-users"))
}

#[test]
fn test_cli_version() {
    let output = jira_users()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("jira-users"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_help() {
    let output = jira_users()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    for command in ["get", "me", "create", "delete", "groups", "find", "auth"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_find_help() {
    let output = jira_users()
        .args(["find", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--max-results"));
    assert!(stdout.contains("--start-at"));
    assert!(stdout.contains("--inactive"));
}

#[test]
fn test_auth_help() {
    let output = jira_users()
        .args(["auth", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Authentication commands") || stdout.contains("login"));
}

#[test]
fn test_get_requires_identity() {
    let output = jira_users()
        .arg("get")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--username") || stderr.contains("--account-id"));
}

#[test]
fn test_invalid_command() {
    let output = jira_users()
        .arg("nonexistent")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand") || stderr.contains("error:"));
}
