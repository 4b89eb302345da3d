//! CLI integration tests
//!
//! Runs the `docportal` binary with `assert_cmd`. Validation failures must
//! be reported before any network activity.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

const UNREACHABLE_CONFIG: &str = r#"
server:
  base_url: http://127.0.0.1:9
  timeout_seconds: 2
"#;

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("docportal").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, config_path) = common::temp_config_file(
        r#"
server:
  base_url: http://localhost:8080
  timeout_seconds: 0
"#,
    );

    let mut cmd = Command::cargo_bin("docportal").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("analyze")
        .arg("report.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_seconds must be greater than 0"));
}

#[test]
fn test_unparsable_config_is_rejected() {
    let (_dir, config_path) = common::temp_config_file("server: [not, a, mapping");

    let mut cmd = Command::cargo_bin("docportal").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("analyze")
        .arg("report.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_analyze_unsupported_file_fails_before_network() {
    let (dir, config_path) = common::temp_config_file(UNREACHABLE_CONFIG);
    let image = common::write_document(&dir, "chart.png", b"\x89PNG");

    let mut cmd = Command::cargo_bin("docportal").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("analyze")
        .arg(image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported type"))
        .stderr(predicate::str::contains("Could not reach the server").not());
}

#[test]
fn test_compare_empty_file_fails_before_network() {
    let (dir, config_path) = common::temp_config_file(UNREACHABLE_CONFIG);
    let old = common::write_document(&dir, "old.pdf", b"%PDF-1.4 old");
    let empty = common::write_document(&dir, "new.txt", b"");

    let mut cmd = Command::cargo_bin("docportal").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("compare")
        .arg("--a")
        .arg(old)
        .arg("--b")
        .arg(empty)
        .assert()
        .failure()
        .stderr(predicate::str::contains("new.txt is empty"));
}

#[test]
fn test_analyze_missing_file_fails() {
    let (_dir, config_path) = common::temp_config_file(UNREACHABLE_CONFIG);

    let mut cmd = Command::cargo_bin("docportal").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("analyze")
        .arg("/nonexistent/docportal/report.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error: something went wrong. Run with --verbose for details.",
        ))
        .stderr(predicate::str::contains("Error: something went wrong (").not());
}

#[tokio::test]
async fn test_analyze_prints_server_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/document_analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {"analysis": {"Title": "Master Lease Agreement"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (dir, config_path) = common::temp_config_file("server:\n  timeout_seconds: 5\n");
    let report = common::write_document(&dir, "lease.pdf", b"%PDF-1.4 lease");
    let base_url = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("docportal")
            .unwrap()
            .arg("--config")
            .arg(config_path)
            .arg("--base-url")
            .arg(base_url)
            .arg("analyze")
            .arg("--json")
            .arg(report)
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Master Lease Agreement"));
    drop(dir);
}
