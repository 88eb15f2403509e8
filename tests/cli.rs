#![cfg(unix)]

use std::path::Path;
use std::process::{Command, Output};

#[test]
fn run_loads_default_dotenv_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(&dir.path().join(".env"), "DOTSOURCE_CLI_DEFAULT=from_default\n");

    let output = run_dotsource(
        dir.path(),
        &["run", "--", "printenv", "DOTSOURCE_CLI_DEFAULT"],
        None,
    );

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "from_default");
}

#[test]
fn run_passes_multiline_values_verbatim() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(
        &dir.path().join(".env"),
        "DOTSOURCE_CLI_MULTI='first\n# not a comment\nthird'\n",
    );

    let output = run_dotsource(
        dir.path(),
        &["run", "--", "printenv", "DOTSOURCE_CLI_MULTI"],
        None,
    );

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "first\n# not a comment\nthird");
}

#[test]
fn run_uses_last_file_precedence_for_selected_files() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(&dir.path().join(".env.base"), "DOTSOURCE_CLI_PRECEDENCE=base\n");
    write_file(&dir.path().join(".env.local"), "DOTSOURCE_CLI_PRECEDENCE=local\n");

    let output = run_dotsource(
        dir.path(),
        &[
            "run",
            "-f",
            ".env.base,.env.local",
            "--",
            "printenv",
            "DOTSOURCE_CLI_PRECEDENCE",
        ],
        None,
    );

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "local");
}

#[test]
fn run_override_flag_controls_existing_environment_precedence() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(&dir.path().join(".env"), "DOTSOURCE_CLI_OVERRIDE=from_file\n");

    let without_override = run_dotsource(
        dir.path(),
        &["run", "--", "printenv", "DOTSOURCE_CLI_OVERRIDE"],
        Some(("DOTSOURCE_CLI_OVERRIDE", "from_env")),
    );
    assert_success(&without_override);
    assert_eq!(stdout_trimmed(&without_override), "from_env");

    let with_override = run_dotsource(
        dir.path(),
        &["run", "-o", "--", "printenv", "DOTSOURCE_CLI_OVERRIDE"],
        Some(("DOTSOURCE_CLI_OVERRIDE", "from_env")),
    );
    assert_success(&with_override);
    assert_eq!(stdout_trimmed(&with_override), "from_file");
}

#[test]
fn run_ignore_missing_skips_missing_selected_files() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(&dir.path().join(".env.real"), "DOTSOURCE_CLI_IGNORE=loaded\n");

    let output = run_dotsource(
        dir.path(),
        &[
            "run",
            "--ignore-missing",
            "-f",
            "missing.env,.env.real",
            "--",
            "printenv",
            "DOTSOURCE_CLI_IGNORE",
        ],
        None,
    );

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "loaded");
}

#[test]
fn run_without_ignore_missing_fails_when_selected_file_is_missing() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let output = run_dotsource(
        dir.path(),
        &["run", "-f", "missing.env", "--", "printenv", "ANY"],
        None,
    );

    assert!(!output.status.success(), "expected missing file to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.env"), "stderr: {stderr:?}");
}

#[test]
fn unterminated_quote_fails_without_leaking_value() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(&dir.path().join(".env"), "TOKEN='super-secret\n");

    let output = run_dotsource(dir.path(), &["print"], None);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unterminated quoted value for key TOKEN"),
        "stderr: {stderr:?}"
    );
    assert!(!stderr.contains("super-secret"), "stderr: {stderr:?}");
}

#[test]
fn print_shell_output_quotes_every_value() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(
        &dir.path().join(".env"),
        "A=value # comment\nB='multi\nline'\nC=it\"s\nD=\"it's\"\n",
    );

    let output = run_dotsource(dir.path(), &["print"], None);

    assert_success(&output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "A='value'\nB='multi\nline'\nC='it\"s'\nD='it'\\''s'\n"
    );
}

#[test]
fn print_shell_output_can_be_sourced_again() {
    if !bash_available() {
        eprintln!("bash not available; skipping re-source check");
        return;
    }

    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(
        &dir.path().join(".env"),
        "A=value # comment\nB='multi\n# kept\nline'\nC=it\"s\nD=\"it's\"\nE='$HOME `x` \\n'\n",
    );

    let output = run_dotsource(dir.path(), &["print"], None);
    assert_success(&output);
    let printed = dir.path().join("printed.sh");
    std::fs::write(&printed, &output.stdout).expect("failed to write printed output");

    let expected = [
        ("A", "value"),
        ("B", "multi\n# kept\nline"),
        ("C", "it\"s"),
        ("D", "it's"),
        ("E", "$HOME `x` \\n"),
    ];
    for (var, value) in expected {
        assert_eq!(sourced_value(&printed, var), value, "mismatch for {var}");
    }
}

#[test]
fn print_json_output_is_an_object_in_file_order() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_file(&dir.path().join(".env"), "Z=last\nA='x\ny'\n");

    let output = run_dotsource(dir.path(), &["print", "--format", "json"], None);

    assert_success(&output);
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["Z"], "last");
    assert_eq!(value["A"], "x\ny");
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.find("\"Z\"") < text.find("\"A\""));
}

fn run_dotsource(dir: &Path, args: &[&str], env_pair: Option<(&str, &str)>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_dotsource"));
    command.current_dir(dir).args(args).env_remove("RUST_LOG");
    if let Some((key, value)) = env_pair {
        command.env(key, value);
    }
    command.output().expect("failed to run dotsource binary")
}

fn bash_available() -> bool {
    Command::new("bash")
        .arg("-c")
        .arg("true")
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn sourced_value(script: &Path, var_name: &str) -> String {
    let output = Command::new("bash")
        .arg("-c")
        .arg(format!("source \"$1\" && printf '%s' \"${var_name}\""))
        .arg("bash")
        .arg(script)
        .output()
        .expect("failed to run bash");
    assert!(
        output.status.success(),
        "bash failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("bash output should be UTF-8")
}

fn stdout_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout)
        .trim_end()
        .to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success: stdout={:?}, stderr={:?}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content).expect("failed to write fixture file");
}
