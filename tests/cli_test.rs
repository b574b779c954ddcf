//! Integration tests for the pipewave binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join(".pipewave");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yml"), config).unwrap();
    temp
}

fn pipewave(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("pipewave"));
    cmd.current_dir(temp.path()).env("NO_COLOR", "1");
    cmd
}

const PIPELINE_CONFIG: &str = r#"
name: catalog
workflow:
  max_parallel_steps: 2
steps:
  applications:
    description: Process vehicle applications
    command: echo applications
  marketing_descriptions:
    command: echo marketing
  popularity_codes:
    command: echo popularity
  sdc_template:
    command: echo sdc
    depends_on: [marketing_descriptions, popularity_codes]
  validation_reports:
    command: echo reports
    depends_on: [applications, marketing_descriptions]
"#;

const FAILING_CONFIG: &str = r#"
workflow:
  retry_failed_steps: false
steps:
  extract:
    command: "false"
  load:
    command: "true"
    depends_on: [extract]
  audit:
    command: "true"
"#;

#[test]
fn cli_no_args_runs_pipeline() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    pipewave(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("Run succeeded: 5 succeeded"));
    Ok(())
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("pipewave"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pipeline step orchestration"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("pipewave"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_run_prints_wave_progress() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    pipewave(&temp)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Wave 1: applications, marketing_descriptions, popularity_codes",
        ))
        .stdout(predicate::str::contains("Wave 2: sdc_template, validation_reports"));
    Ok(())
}

#[test]
fn cli_run_failure_exits_one_and_skips_dependents() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(FAILING_CONFIG);
    pipewave(&temp)
        .arg("run")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("load skipped: dependency 'extract' failed"))
        .stderr(predicate::str::contains("extract failed after 1 attempt"));
    Ok(())
}

#[test]
fn cli_run_fail_fast_aborts() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(FAILING_CONFIG);
    pipewave(&temp)
        .args(["run", "--fail-fast", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""status": "aborted""#));
    Ok(())
}

#[test]
fn cli_run_steps_override() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(FAILING_CONFIG);
    pipewave(&temp)
        .args(["run", "--steps", "audit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Run succeeded: 1 succeeded"));
    Ok(())
}

#[test]
fn cli_run_unknown_step_is_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    pipewave(&temp)
        .args(["run", "--steps", "ghost"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown step: ghost"));
    Ok(())
}

#[test]
fn cli_run_writes_report_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    let report_path = temp.path().join("report.json");
    pipewave(&temp)
        .args(["run", "--quiet", "--report"])
        .arg(&report_path)
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(report["status"], "succeeded");
    assert_eq!(report["steps"]["applications"]["output"]["data"], "applications");
    assert_eq!(report["waves"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn cli_run_times_out_slow_step() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
steps:
  slow:
    command: sleep 5
    timeout_secs: 1
"#,
    );
    pipewave(&temp)
        .args(["run", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""status": "timed_out""#));
    Ok(())
}

#[test]
fn cli_run_no_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = Command::new(cargo_bin("pipewave"));
    cmd.current_dir(temp.path());
    cmd.arg("run");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("No configuration found"));
    Ok(())
}

#[test]
fn cli_config_flag_loads_explicit_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let path = temp.path().join("pipeline.yml");
    fs::write(&path, "steps:\n  only:\n    command: 'true'\n")?;
    pipewave(&temp)
        .arg("--config")
        .arg(&path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("only"));
    Ok(())
}

#[test]
fn cli_plan_shows_waves() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    pipewave(&temp)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("5 steps in 2 waves"))
        .stdout(predicate::str::contains("after: marketing_descriptions, popularity_codes"));
    Ok(())
}

#[test]
fn cli_plan_does_not_execute() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("steps:\n  touch:\n    command: touch marker\n");
    pipewave(&temp).arg("plan").assert().success();
    assert!(!temp.path().join("marker").exists());
    Ok(())
}

#[test]
fn cli_list_shows_steps() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    pipewave(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog (5 steps)"))
        .stdout(predicate::str::contains(
            "applications - Process vehicle applications",
        ));
    Ok(())
}

#[test]
fn cli_lint_validates_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    pipewave(&temp)
        .arg("lint")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Configuration is valid: 5 steps in 2 waves",
        ));
    Ok(())
}

#[test]
fn cli_lint_reports_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
steps:
  a:
    command: "true"
    depends_on: [c]
  b:
    command: "true"
    depends_on: [a]
  c:
    command: "true"
    depends_on: [b]
"#,
    );
    pipewave(&temp)
        .arg("lint")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Circular dependency detected"));
    Ok(())
}

#[test]
fn cli_run_with_cycle_never_executes() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
steps:
  a:
    command: touch marker
    depends_on: [b]
  b:
    command: "true"
    depends_on: [a]
"#,
    );
    pipewave(&temp).arg("run").assert().code(2);
    assert!(!temp.path().join("marker").exists());
    Ok(())
}

#[test]
fn cli_completions_generates_script() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("pipewave"));
    cmd.args(["completions", "bash"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pipewave"));
    Ok(())
}

#[test]
fn cli_debug_flag_logs_to_stderr() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE_CONFIG);
    pipewave(&temp)
        .args(["--debug", "plan"])
        .assert()
        .success()
        .stderr(predicate::str::contains("prepared run"));
    Ok(())
}

#[test]
fn cli_invalid_command_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("pipewave"));
    cmd.arg("invalid-command");
    cmd.assert().failure();
    Ok(())
}
