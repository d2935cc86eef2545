use plan_runner::error::PlanLoadError;
use plan_runner::plan::{Plan, Step, load_plan, save_plan};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_plan(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("plan.json");
    fs::write(&path, contents).unwrap();
    path
}

fn run_binary(plan: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plan-runner"))
        .arg(plan)
        .env("LOG_LEVEL", "error")
        .output()
        .expect("failed to start plan-runner")
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = load_plan(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, PlanLoadError::NotFound(_)));
}

#[test]
fn test_empty_and_blank_files() {
    let dir = TempDir::new().unwrap();

    let path = write_plan(&dir, "");
    assert!(matches!(load_plan(&path), Err(PlanLoadError::Empty(_))));

    let path = write_plan(&dir, "  \n\t\n");
    assert!(matches!(load_plan(&path), Err(PlanLoadError::Empty(_))));
}

#[test]
fn test_unparseable_and_stepless_documents() {
    let dir = TempDir::new().unwrap();

    let path = write_plan(&dir, "{\"goal\": \"g\", \"steps\": [");
    assert!(matches!(load_plan(&path), Err(PlanLoadError::Malformed(_))));

    let path = write_plan(&dir, r#"{"goal": "g"}"#);
    assert!(matches!(load_plan(&path), Err(PlanLoadError::MissingSteps)));

    let path = write_plan(&dir, r#"{"goal": "g", "steps": [{"args": {"url": "x"}}]}"#);
    assert!(matches!(load_plan(&path), Err(PlanLoadError::InvalidStep { index: 1, .. })));
}

#[test]
fn test_saved_plan_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("generated.json");

    let args = json!({"selector": ".inventory_item_price"}).as_object().cloned().unwrap();
    let plan = Plan::new("price", vec![Step::new("extract_text", args).with_id("price")])
        .with_final_report("Price: {price}");

    save_plan(&path, &plan).unwrap();
    assert_eq!(load_plan(&path).unwrap(), plan);
}

#[test]
fn test_invalid_plan_exits_with_load_code() {
    let dir = TempDir::new().unwrap();
    let path = write_plan(&dir, "{ this is not json");

    let output = run_binary(&path);

    assert_eq!(output.status.code(), Some(PlanLoadError::EXIT_CODE));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not valid JSON"), "stderr: {}", stderr);
}

#[test]
fn test_missing_plan_exits_with_load_code() {
    let dir = TempDir::new().unwrap();

    let output = run_binary(&dir.path().join("nowhere.json"));

    assert_eq!(output.status.code(), Some(PlanLoadError::EXIT_CODE));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn test_plan_without_steps_exits_with_load_code() {
    let dir = TempDir::new().unwrap();
    let path = write_plan(&dir, r#"{"goal": "g", "final_report": "done"}"#);

    let output = run_binary(&path);

    assert_eq!(output.status.code(), Some(PlanLoadError::EXIT_CODE));
    assert!(output.stdout.is_empty());
}
