#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use regex::Regex;
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn Error>>;

const LOG_FILE: &str = "failguard.log";

fn failguard(home: &Path, args: &[&str]) -> TestResult<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_failguard"))
        .arg("--home")
        .arg(home)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("RUST_BACKTRACE")
        .env_remove("RUST_LIB_BACKTRACE")
        .output()?;
    Ok(output)
}

fn stderr_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .replace('\r', "")
        .lines()
        .map(str::to_string)
        .collect()
}

fn log_lines(path: &Path) -> TestResult<Vec<String>> {
    Ok(fs::read_to_string(path)?.lines().map(str::to_string).collect())
}

fn assert_version_section(lines: &[String]) -> TestResult {
    assert_eq!(lines[0], "### version information");
    assert!(Regex::new(r"^failguard\.version=\d+\.\d+\.\d+$")?.is_match(&lines[1]));
    assert!(lines[2].starts_with("sys.version=rustc "));
    assert!(lines[3].starts_with("sys.executable="));
    assert_eq!(lines[4], "### error information");
    Ok(())
}

#[test]
fn success_leaves_no_trace() -> TestResult {
    let home = TempDir::new()?;
    let output = failguard(home.path(), &["--", "true"])?;

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty());
    assert!(!home.path().join(LOG_FILE).exists());
    Ok(())
}

#[test]
fn failing_command_is_a_fatal_error() -> TestResult {
    let home = TempDir::new()?;
    let log_path = home.path().join(LOG_FILE);
    let output = failguard(home.path(), &["--console-encoding", "utf8", "--", "false"])?;

    assert_eq!(output.status.code(), Some(1));

    let printed = stderr_lines(&output);
    assert_eq!(printed.len(), 7);
    assert_version_section(&printed)?;
    assert_eq!(
        printed[5],
        "An error has occurred: FatalError: `false` failed (exit status: 1)"
    );
    assert_eq!(printed[6], format!("Check the log at {}", log_path.display()));

    let logged = log_lines(&log_path)?;
    assert_eq!(logged[..6], printed[..6]);
    assert!(Regex::new(r"^raised at src/lib\.rs:\d+:\d+$")?.is_match(&logged[6]));
    assert_eq!(logged[7], "FatalError: `false` failed (exit status: 1)");
    assert_eq!(logged.len(), 8);
    Ok(())
}

#[test]
fn non_ascii_message_survives_both_sinks() -> TestResult {
    let home = TempDir::new()?;
    let log_path = home.path().join(LOG_FILE);
    let output = failguard(home.path(), &["--console-encoding", "utf8", "--", "\u{2603}"])?;

    assert_eq!(output.status.code(), Some(1));

    let printed = stderr_lines(&output);
    assert_eq!(
        printed[printed.len() - 2],
        "An unexpected error has occurred: CommandError: failed to spawn `☃`"
    );
    assert_eq!(
        printed[printed.len() - 1],
        format!("Check the log at {}", log_path.display())
    );

    let logged = log_lines(&log_path)?;
    assert_eq!(
        logged[5],
        "An unexpected error has occurred: CommandError: failed to spawn `☃`"
    );
    assert!(logged[6].starts_with("raised at src/lib.rs:"));
    assert_eq!(logged[7], "CommandError: failed to spawn `☃`");
    assert_eq!(logged[8], "");
    assert_eq!(logged[9], "Caused by:");
    assert!(logged[10].starts_with("    "));
    Ok(())
}

#[test]
fn ascii_console_gets_escaped_summary() -> TestResult {
    let home = TempDir::new()?;
    let log_path = home.path().join(LOG_FILE);
    let output = failguard(home.path(), &["--console-encoding", "ascii", "--", "\u{2603}"])?;

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.is_ascii());

    let printed = stderr_lines(&output);
    assert_eq!(printed.len(), 7);
    assert_eq!(
        printed[5],
        "An unexpected error has occurred: CommandError: failed to spawn `\\u{2603}`"
    );

    let logged = fs::read_to_string(&log_path)?;
    assert!(logged.contains("failed to spawn `☃`"));
    assert!(!logged.contains("\\u{2603}"));
    Ok(())
}

#[test]
fn sigint_is_reported_as_interrupt() -> TestResult {
    let home = TempDir::new()?;
    let output = failguard(home.path(), &["--", "sh", "-c", "kill -INT $$"])?;

    assert_eq!(output.status.code(), Some(1));

    let printed = stderr_lines(&output);
    assert_eq!(printed.len(), 7);
    assert_eq!(printed[5], "Interrupted (^C): Interrupted: ");

    let logged = log_lines(&home.path().join(LOG_FILE))?;
    assert!(logged[6].starts_with("raised at src/lib.rs:"));
    assert_eq!(logged[7], "Interrupted");
    Ok(())
}

#[test]
fn reports_append_to_the_same_log() -> TestResult {
    let home = TempDir::new()?;
    failguard(home.path(), &["--", "false"])?;
    failguard(home.path(), &["--", "sh", "-c", "exit 3"])?;

    let logged = log_lines(&home.path().join(LOG_FILE))?;
    assert_eq!(logged.len(), 16);
    assert_eq!(logged[0], "### version information");
    assert_eq!(logged[8], "### version information");
    assert!(logged[5].ends_with("`false` failed (exit status: 1)"));
    assert!(logged[13].ends_with("`sh` failed (exit status: 3)"));
    Ok(())
}

#[test]
fn unusable_home_is_reported_once_and_still_fails() -> TestResult {
    let scratch = TempDir::new()?;
    let blocker = scratch.path().join("file");
    fs::write(&blocker, "not a directory")?;
    let home = blocker.join("sub");

    let output = failguard(&home, &["--", "false"])?;

    assert_eq!(output.status.code(), Some(1));
    let printed = stderr_lines(&output);
    assert_eq!(printed.len(), 1);
    assert!(printed[0].starts_with("failguard: could not resolve the log directory: "));
    assert!(printed[0].contains("failed to create storage directory"));
    assert!(!home.join(LOG_FILE).exists());
    assert_eq!(fs::read_to_string(&blocker)?, "not a directory");
    Ok(())
}

#[test]
fn home_defaults_to_environment() -> TestResult {
    let scratch = TempDir::new()?;
    let home: PathBuf = scratch.path().join("from-env");

    let output = Command::new(env!("CARGO_BIN_EXE_failguard"))
        .args(["--", "false"])
        .env("FAILGUARD_HOME", &home)
        .env_remove("RUST_LOG")
        .env_remove("RUST_BACKTRACE")
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let printed = stderr_lines(&output);
    assert_eq!(
        printed.last().map(String::as_str),
        Some(format!("Check the log at {}", home.join(LOG_FILE).display()).as_str())
    );
    assert!(home.join(LOG_FILE).is_file());
    assert!(home.join("README").is_file());
    Ok(())
}
