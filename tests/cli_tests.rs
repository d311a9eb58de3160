// CLI behavior: exit codes, JSON output and miette-rendered reports.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn among() -> Command {
    Command::cargo_bin("among").unwrap()
}

#[test]
fn cli_check_walks_directories() {
    among()
        .args(["check", "tests/scripts/ok"])
        .assert()
        .success()
        .stderr(contains("checked 2 file(s)").and(contains("0 error(s), 0 warning(s)")));
}

#[test]
fn cli_check_fails_on_errors() {
    among()
        .args(["check", "tests/scripts/bad/duplicate.among"])
        .assert()
        .code(1)
        .stderr(contains("Property 'a' is already defined").and(contains("1 error(s)")));
}

#[test]
fn cli_flags_relax_errors_into_warnings() {
    among()
        .args(["check", "--allow-duplicate-properties", "tests/scripts/bad/duplicate.among"])
        .assert()
        .success()
        .stderr(contains("0 error(s), 1 warning(s)"));
}

#[test]
fn cli_ast_prints_json() {
    among()
        .args(["ast", "--compact", "tests/scripts/ok/main.among"])
        .assert()
        .success()
        .stdout(contains(r#"{"elements":["1","2"]}"#).and(contains(r#""name":"+""#)));
}

#[test]
fn cli_macros_lists_exported_definitions() {
    among()
        .args(["macros", "tests/scripts/ok/shapes.among"])
        .assert()
        .success()
        .stdout(contains("operators").and(contains("macros")).and(contains("point{x, y}")));
}

#[test]
fn cli_unreadable_file_is_a_host_error() {
    among()
        .args(["ast", "tests/scripts/missing.among"])
        .assert()
        .code(2)
        .stderr(contains("tests/scripts/missing.among"));
}
