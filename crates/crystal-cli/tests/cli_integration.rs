use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// `crystal` with an isolated settings directory and working directory.
fn crystal(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crystal").unwrap();
    cmd.env("CRYSTAL_HOME", home.path())
        .env_remove("RUST_LOG")
        .current_dir(home.path());
    cmd
}

#[test]
fn test_help_exits_zero() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("crystal"));
}

#[test]
fn test_run_script_prints_output() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("hello.cry"))
        .write_stdin("")
        .assert()
        .success()
        .stdout("Value: 8\n16\n");
}

#[test]
fn test_loops() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("count.cry"))
        .write_stdin("")
        .assert()
        .success()
        .stdout("Count: 1\nCount: 2\nCount: 3\nn is 2\n");
}

#[test]
fn test_include_relative_to_script() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("functions.cry"))
        .write_stdin("")
        .assert()
        .success()
        .stdout("Hello, World!\nGoodbye, World.\n");
}

#[test]
fn test_runtime_error_exit_code() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("runtime_error.cry"))
        .write_stdin("")
        .assert()
        .code(1)
        .stdout("before\n")
        .stderr(predicate::str::contains("Error: File system error at line 2"));
}

#[test]
fn test_syntax_error_exit_code() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("syntax_error.cry"))
        .write_stdin("")
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("'end if' to close 'if' block opened at line 2"));
}

#[test]
fn test_try_catch_recovers() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("try_catch.cry"))
        .write_stdin("")
        .assert()
        .success()
        .stdout("Could not delete file\ndone\n");
}

#[test]
fn test_include_cycle_is_an_error() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("cycle_a.cry"))
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Circular include detected"));
}

#[test]
fn test_missing_script_exit_code() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("no_such_script.cry"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Script not found"));
}

#[test]
fn test_non_cry_extension_warns_but_runs() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .arg(fixture_path("plain.txt"))
        .write_stdin("")
        .assert()
        .success()
        .stdout("plain text script\n")
        .stderr(predicate::str::contains("is not a .cry file"));
}

#[test]
fn test_file_statements_with_yes() {
    let home = TempDir::new().unwrap();
    let rule = "-".repeat(50);
    let expected = format!(
        "[SUCCESS] Created 1 folder(s):\n  - ./work\n\
         [SUCCESS] Created file: ./work/hello.txt\n\
         [SUCCESS] Created file: ./work/empty.txt\n\
         Listing files in: ./work\n{}\n  empty.txt\n  hello.txt\nTotal: 2 item(s)\n\
         hello exists\n\
         [SUCCESS] Deleted: ./work/empty.txt\n",
        rule
    );
    crystal(&home)
        .args(["--yes"])
        .arg(fixture_path("files.cry"))
        .write_stdin("")
        .assert()
        .success()
        .stdout(expected);

    let hello = home.path().join("work").join("hello.txt");
    assert_eq!(std::fs::read_to_string(hello).unwrap(), "Hi there");
    assert!(!home.path().join("work").join("empty.txt").exists());
}

#[test]
fn test_quiet_suppresses_reports() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .args(["--yes", "--quiet"])
        .arg(fixture_path("files.cry"))
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("[SUCCESS]").not())
        .stdout(predicate::str::contains("hello exists"));
}

#[test]
fn test_delete_declined_on_closed_input() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("keep.txt"), "x").unwrap();
    let script = home.path().join("remove.cry");
    std::fs::write(&script, "delete ./keep.txt\n").unwrap();

    crystal(&home)
        .arg(&script)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("[WARNING] About to delete ./keep.txt"))
        .stdout(predicate::str::contains("[CANCELLED] Delete operation cancelled"));
    assert!(home.path().join("keep.txt").exists());
}

#[test]
fn test_config_file_disables_confirmation() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.json"),
        r#"{"confirm_destructive": false, "report_actions": false}"#,
    )
    .unwrap();
    std::fs::write(home.path().join("gone.txt"), "x").unwrap();
    let script = home.path().join("remove.cry");
    std::fs::write(&script, "delete ./gone.txt\n").unwrap();

    crystal(&home)
        .arg(&script)
        .write_stdin("")
        .assert()
        .success()
        .stdout("");
    assert!(!home.path().join("gone.txt").exists());
}

#[test]
fn test_ask_reads_stdin() {
    let home = TempDir::new().unwrap();
    let script = home.path().join("ask.cry");
    std::fs::write(&script, "ask \"Name?\" local 'name'\nsay \"Hi 'name'\"\n").unwrap();

    crystal(&home)
        .arg(&script)
        .write_stdin("Ada\n")
        .assert()
        .success()
        .stdout("Name? Hi Ada\n");
}

#[test]
fn test_repl_keeps_state_between_lines() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .write_stdin("set local 'x' = 2\n\nsay 'x' * 21\nexit\nsay \"unreachable\"\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Crystal Shell v"))
        .stdout(predicate::str::contains("Type 'exit' to quit"))
        .stdout(predicate::str::contains("crystal> 42\n"))
        .stdout(predicate::str::contains("unreachable").not());
}

#[test]
fn test_repl_reports_errors_and_continues() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .write_stdin("say 'ghost'\nsay \"still alive\"\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Error: Undefined variable 'ghost' at line 1"))
        .stdout(predicate::str::contains("still alive"));
}

#[test]
fn test_repl_multi_line_block() {
    let home = TempDir::new().unwrap();
    crystal(&home)
        .write_stdin("repeat 2\nsay \"again\"\nend repeat\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("   ...> "))
        .stdout(predicate::str::contains("again\nagain\n"));
}
