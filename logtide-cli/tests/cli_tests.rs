//! End-to-end tests for the `logtide` binary.

use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const DNS_LINE: &str = r#"{"ts":1700000000.5,"uid":"C1","id.orig_h":"10.0.0.5","id.orig_p":53124,"id.resp_h":"10.0.0.1","id.resp_p":53,"proto":"udp","query":"example.com"}"#;

const VPC_LINE: &str = "2 123456789010 eni-1235b8ca123456789 172.31.16.139 172.31.16.21 20641 22 6 20 4249 1418530010 1418530070 ACCEPT OK";

fn logtide(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_logtide"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run logtide")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn logtypes_list_json() {
    let output = logtide(&["--output", "json", "logtypes", "list"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json");
    let names: Vec<&str> = report["log_types"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(report["total"].as_u64(), Some(names.len() as u64));
    assert!(names.contains(&"AWS.VPCFlow"));
}

#[test]
fn logtypes_show_unknown_exits_with_code_3() {
    let output = logtide(&["logtypes", "show", "Nope.Missing"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("unknown log type"));
}

#[test]
fn parse_file_prints_json_lines() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("flows.log");
    fs::write(&input, format!("{VPC_LINE}\n{VPC_LINE}\n")).expect("write input");

    let output = logtide(&["parse", "--log-type", "AWS.VPCFlow", input.to_str().expect("utf-8")]);
    assert!(output.status.success(), "{}", stderr(&output));

    let events: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["dstport"], 22);
    assert_eq!(events[0]["p_log_type"], "AWS.VPCFlow");
    assert_ne!(events[0]["p_row_id"], events[1]["p_row_id"]);
    assert!(stderr(&output).contains("Events emitted:  2"));
}

#[test]
fn parse_strict_fails_on_dropped_records() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("dns.log");
    fs::write(&input, format!("{DNS_LINE}\nnot json\n")).expect("write input");
    let path = input.to_str().expect("utf-8");

    let lenient = logtide(&["parse", "-t", "Zeek.DNS", path]);
    assert!(lenient.status.success());
    assert_eq!(stdout(&lenient).lines().count(), 1);

    let strict = logtide(&["parse", "-t", "Zeek.DNS", "--strict", path]);
    assert_eq!(strict.status.code(), Some(4));
    assert_eq!(stdout(&strict).lines().count(), 1);
    assert!(stderr(&strict).contains("1 records dropped"));
}

#[test]
fn parse_reads_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_logtide"))
        .args(["parse", "--log-type", "Zeek.DNS", "-"])
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn logtide");
    {
        let mut stdin = child.stdin.take().expect("stdin");
        writeln!(stdin, "{DNS_LINE}").expect("write stdin");
    }
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success(), "{}", stderr(&output));

    let event: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("json line");
    assert_eq!(event["p_source_id"], "stdin");
    assert_eq!(event["query"], "example.com");
}

#[test]
fn parse_missing_file_is_io_error() {
    let output = logtide(&["parse", "-t", "Zeek.DNS", "/nonexistent/dns.log"]);
    assert_eq!(output.status.code(), Some(10));
}

#[test]
fn config_validate_reports_invalid_rule() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("logtide.toml");
    fs::write(
        &config,
        r#"
[[pipeline.classification]]
match = "prefix"
pattern = "/var/log/"
log_type = "Nope.Missing"
"#,
    )
    .expect("write config");

    let output = logtide(&["--config", config.to_str().expect("utf-8"), "config", "validate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("INVALID"));
}

#[test]
fn config_show_json_section() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("logtide.toml");
    fs::write(&config, "[pipeline]\nworkers = 2\n").expect("write config");

    let output = logtide(&[
        "--config",
        config.to_str().expect("utf-8"),
        "--output",
        "json",
        "config",
        "show",
        "--section",
        "pipeline",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json");
    assert_eq!(report["section"], "pipeline");
    assert_eq!(report["config"]["workers"], 2);
}
