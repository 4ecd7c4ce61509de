//! Integration tests for the `access-checkout validate-*` commands.
#![allow(clippy::expect_used)]

use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Path to the compiled `access-checkout` binary.
fn checkout_bin() -> PathBuf {
    let mut path = std::env::current_exe().expect("current exe");
    // current_exe is something like …/deps/cmd_validate-<hash>
    // The binary lives in the parent directory.
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("access-checkout");
    path
}

/// Path to a shared fixture file.
fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../../tests/fixtures");
    path.push(name);
    path
}

/// Runs the binary with a clean environment for the variables it reads.
fn run(args: &[&str]) -> Output {
    Command::new(checkout_bin())
        .args(args)
        .env_remove("ACCESS_CHECKOUT_CARD_CONFIG")
        .env_remove("ACCESS_CHECKOUT_MAX_FILE_SIZE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("run access-checkout")
}

fn with_fixture<'a>(config: &'a str, args: &[&'a str]) -> Vec<&'a str> {
    let mut all = vec!["--card-config", config];
    all.extend_from_slice(args);
    all
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn json_stdout(out: &Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).expect("stdout should be one JSON document")
}

// ---------------------------------------------------------------------------
// validate-pan
// ---------------------------------------------------------------------------

#[test]
fn validate_pan_complete_visa_exits_0() {
    let config = fixture("card-configuration.json");
    let config = config.to_str().expect("path");
    let out = run(&with_fixture(config, &["validate-pan", "4111111111111111"]));
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let text = stdout(&out);
    assert!(text.starts_with("[OK] pan"), "stdout: {text}");
    assert!(text.contains("(visa)"), "stdout: {text}");
}

#[test]
fn validate_pan_partial_exits_1() {
    let out = run(&["validate-pan", "4111"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("partial"));
}

#[test]
fn validate_pan_luhn_failure_exits_1() {
    let out = run(&["-f", "json", "validate-pan", "4111111111111112"]);
    assert_eq!(out.status.code(), Some(1));
    let json = json_stdout(&out);
    assert_eq!(json["field"], "pan");
    assert_eq!(json["complete"], false);
    assert!(
        out.stderr.is_empty(),
        "json mode should keep stderr free of plain text: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn validate_pan_human_failure_explains_on_stderr() {
    let out = run(&["validate-pan", "4111111111111112"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("card details are not complete"), "stderr: {stderr}");
}

#[test]
fn validate_pan_json_reports_brand() {
    let config = fixture("card-configuration.json");
    let config = config.to_str().expect("path");
    let out = run(&with_fixture(
        config,
        &["-f", "json", "validate-pan", "5555555555554444"],
    ));
    assert_eq!(out.status.code(), Some(0));
    let json = json_stdout(&out);
    assert_eq!(json["brand"], "mastercard");
    assert_eq!(json["complete"], true);
    assert!(json.get("brandAccepted").is_none());
}

#[test]
fn validate_pan_unaccepted_brand_exits_1() {
    let config = fixture("card-configuration.json");
    let config = config.to_str().expect("path");
    let out = run(&with_fixture(
        config,
        &[
            "-f",
            "json",
            "validate-pan",
            "5555555555554444",
            "--accepted-brand",
            "visa",
        ],
    ));
    assert_eq!(out.status.code(), Some(1));
    let json = json_stdout(&out);
    assert_eq!(json["brand"], "mastercard");
    assert_eq!(json["brandAccepted"], false);
    assert_eq!(json["complete"], false);
}

// ---------------------------------------------------------------------------
// validate-cvv
// ---------------------------------------------------------------------------

#[test]
fn validate_cvv_uses_brand_rule() {
    let config = fixture("card-configuration.json");
    let config = config.to_str().expect("path");

    let amex = run(&with_fixture(
        config,
        &["validate-cvv", "123", "--pan", "378282246310005"],
    ));
    assert_eq!(amex.status.code(), Some(1), "amex needs four digits");

    let amex = run(&with_fixture(
        config,
        &["validate-cvv", "1234", "--pan", "378282246310005"],
    ));
    assert_eq!(amex.status.code(), Some(0));
}

#[test]
fn validate_cvv_letters_rejected() {
    let out = run(&["validate-cvv", "12a"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).starts_with("[XX]"));
}

// ---------------------------------------------------------------------------
// validate-date
// ---------------------------------------------------------------------------

#[test]
fn validate_date_future_exits_0() {
    let out = run(&["validate-date", "12", "99"]);
    assert_eq!(out.status.code(), Some(0), "stdout: {}", stdout(&out));
}

#[test]
fn validate_date_expired_exits_1() {
    let out = run(&["-f", "json", "validate-date", "01", "20"]);
    assert_eq!(out.status.code(), Some(1));
    let json = json_stdout(&out);
    assert_eq!(json["field"], "expiry");
    assert_eq!(json["complete"], false);
}

#[test]
fn validate_date_bad_month_exits_1() {
    let out = run(&["validate-date", "13", "30"]);
    assert_eq!(out.status.code(), Some(1));
}

// ---------------------------------------------------------------------------
// validate-card
// ---------------------------------------------------------------------------

#[test]
fn validate_card_ready_to_submit() {
    let out = run(&[
        "validate-card",
        "--pan",
        "4111111111111111",
        "--expiry",
        "12/99",
        "--cvc",
        "123",
    ]);
    assert_eq!(out.status.code(), Some(0), "stdout: {}", stdout(&out));
    assert!(stdout(&out).contains("ready to submit"));
}

#[test]
fn validate_card_counts_incomplete_fields() {
    let out = run(&["validate-card", "--pan", "4111111111111111", "--expiry", "1299"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("1 field incomplete"), "stdout: {}", stdout(&out));
}

#[test]
fn validate_card_json_report() {
    let out = run(&["-f", "json", "validate-card", "--cvc", "12"]);
    assert_eq!(out.status.code(), Some(1));
    let json = json_stdout(&out);
    assert_eq!(json["cvc"]["partial"], true);
    assert_eq!(json["cvc"]["complete"], false);
    assert_eq!(json["pan"]["complete"], false);
}

// ---------------------------------------------------------------------------
// NO_COLOR
// ---------------------------------------------------------------------------

#[test]
fn no_color_env_accepts_any_non_empty_value() {
    for value in ["1", "yes", "true"] {
        let out = Command::new(checkout_bin())
            .args(["validate-pan", "4111111111111111"])
            .env_remove("ACCESS_CHECKOUT_CARD_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", value)
            .output()
            .expect("run access-checkout");
        assert_eq!(
            out.status.code(),
            Some(0),
            "NO_COLOR={value}; stderr: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        assert!(
            !out.stdout.contains(&0x1b),
            "NO_COLOR={value} should disable escape codes"
        );
    }
}

// ---------------------------------------------------------------------------
// card configuration input (exit 2)
// ---------------------------------------------------------------------------

#[test]
fn missing_card_config_exits_2() {
    let out = run(&["--card-config", "/nonexistent/rules.json", "validate-cvv", "123"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("file not found"), "stderr: {stderr}");
}

#[test]
fn malformed_card_config_exits_2() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"{\"brands\": [ { \"name\": ").expect("write");
    let path = file.path().to_str().expect("path");
    let out = run(&["--card-config", path, "validate-cvv", "123"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid card configuration"), "stderr: {stderr}");
}

#[test]
fn oversized_card_config_exits_2() {
    let config = fixture("card-configuration.json");
    let config = config.to_str().expect("path");
    let out = run(&[
        "--card-config",
        config,
        "--max-file-size",
        "16",
        "validate-cvv",
        "123",
    ]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn feed_card_config_is_accepted() {
    let config = fixture("card-brands-feed.json");
    let config = config.to_str().expect("path");
    let out = run(&with_fixture(
        config,
        &["-f", "json", "validate-pan", "378282246310005"],
    ));
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_eq!(json_stdout(&out)["brand"], "amex");
}
