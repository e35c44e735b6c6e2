//! End-to-end tests for the `qa` binary
//!
//! Each test initialises a fresh workspace in a temp directory and drives
//! the requirement → test case → script → execution chain through the CLI.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled qa binary
fn qa_bin() -> String {
    env!("CARGO_BIN_EXE_qa").to_string()
}

struct Output {
    stdout: String,
    stderr: String,
    code: i32,
}

/// Run `qa -p <dir> <args>`
fn run_qa(dir: &Path, args: &[&str]) -> Output {
    let output = Command::new(qa_bin())
        .arg("-p")
        .arg(dir)
        .args(args)
        .env_remove("QA_ACTOR")
        .env_remove("QA_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute qa with args {:?}: {}", args, e));
    Output {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        code: output.status.code().unwrap_or(-1),
    }
}

/// Run a command that must succeed and return its stdout
fn qa_ok(dir: &Path, args: &[&str]) -> String {
    let out = run_qa(dir, args);
    assert_eq!(
        out.code, 0,
        "qa {:?} failed\nstdout: {}\nstderr: {}",
        args, out.stdout, out.stderr
    );
    out.stdout
}

/// Run a command with `--output json` and parse its stdout
fn qa_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--output", "json"];
    full.extend_from_slice(args);
    let stdout = qa_ok(dir, &full);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("qa {:?} printed invalid JSON ({e}): {stdout}", args))
}

/// Workspace with PROJ-001 and the checkout requirement REQ-001 in draft
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    qa_ok(dir.path(), &["init", "--name", "shop", "--default-actor", "qa.lead"]);
    qa_ok(
        dir.path(),
        &[
            "project",
            "create",
            "--name",
            "E-Commerce Platform",
            "--owner",
            "john.doe@company.com",
            "--release",
            "R2.1",
            "--framework",
            "cypress",
            "--language",
            "javascript",
        ],
    );
    qa_ok(
        dir.path(),
        &[
            "req",
            "ingest",
            "--project",
            "PROJ-001",
            "--title",
            "User Checkout Process",
            "--description",
            "Users must be logged in to check out. \
             The user selects a payment method and enters credit card details. \
             All items must be in stock and the payment method must be valid. \
             Checkout must complete within 15 minutes. \
             The Payment Service API confirms the charge.",
            "--criterion",
            "Order is created",
            "--criterion",
            "Confirmation email is sent",
        ],
    );
    dir
}

/// Workspace whose requirement has generated scenarios and test cases
fn generated_workspace() -> TempDir {
    let dir = workspace();
    qa_ok(dir.path(), &["req", "analyze", "REQ-001"]);
    qa_ok(dir.path(), &["scenario", "generate", "REQ-001"]);
    qa_ok(dir.path(), &["case", "generate", "REQ-001"]);
    dir
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let first = qa_json(dir.path(), &["init", "--name", "shop"]);
    assert_eq!(first["name"], "shop");
    assert!(dir.path().join("qa.yml").exists());

    let again = run_qa(dir.path(), &["init"]);
    assert_ne!(again.code, 0);
    assert!(again.stderr.contains("--force"), "stderr: {}", again.stderr);

    qa_ok(dir.path(), &["init", "--force"]);
}

#[test]
fn test_commands_require_an_initialised_workspace() {
    let dir = TempDir::new().unwrap();
    let out = run_qa(dir.path(), &["project", "list"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("qa init"), "stderr: {}", out.stderr);
}

#[test]
fn test_full_chain_through_execution() {
    let dir = generated_workspace();

    let requirement = qa_json(dir.path(), &["req", "show", "REQ-001"]);
    assert_eq!(requirement["requirement"]["status"], "test-cases-generated");

    let cases = qa_json(dir.path(), &["case", "list", "--requirement", "REQ-001"]);
    assert_eq!(cases.as_array().unwrap().len(), 5);

    qa_ok(dir.path(), &["case", "approve", "TC-001", "--expect-version", "v1"]);
    qa_ok(dir.path(), &["case", "approve", "TC-002"]);
    let script = qa_json(dir.path(), &["script", "generate", "TC-001"]);
    assert_eq!(script["produced"][0], "SCR-001");
    qa_ok(dir.path(), &["script", "generate", "TC-002"]);
    qa_ok(dir.path(), &["script", "approve", "SCR-001"]);
    qa_ok(dir.path(), &["script", "approve", "SCR-002"]);

    let code = qa_ok(dir.path(), &["script", "show", "SCR-001", "--code"]);
    assert!(!code.trim().is_empty());

    let execution = qa_json(dir.path(), &["exec", "start", "PROJ-001", "--triggered-by", "ci"]);
    assert_eq!(execution["id"], "EXE-001");
    assert_eq!(execution["plan"].as_array().unwrap().len(), 2);

    qa_ok(
        dir.path(),
        &[
            "exec",
            "record",
            "EXE-001",
            "--case",
            "TC-001",
            "--status",
            "passed",
            "--duration-ms",
            "1200",
        ],
    );
    let running = qa_json(dir.path(), &["exec", "show", "EXE-001"]);
    assert_eq!(running["execution"]["status"], "running");
    assert_eq!(running["pending"].as_array().unwrap().len(), 1);

    // finishing early records the unreported run as skipped
    let finished = qa_json(dir.path(), &["exec", "finish", "EXE-001"]);
    assert_eq!(finished["execution"]["status"], "partial");
    assert_eq!(finished["summary"]["passed"], 1);
    assert_eq!(finished["summary"]["skipped"], 1);
    assert_eq!(finished["summary"]["total"], 2);

    let again = run_qa(dir.path(), &["exec", "finish", "EXE-001"]);
    assert_eq!(again.code, 3, "stderr: {}", again.stderr);

    let dashboard = qa_json(dir.path(), &["dashboard", "--project", "PROJ-001"]);
    assert_eq!(dashboard["project_id"], "PROJ-001");
    assert_eq!(dashboard["pass_rate"], 100.0);
    assert_eq!(dashboard["automation_rate"], 100.0);
    // three generated cases still await review
    assert_eq!(dashboard["pending_approvals"]["test_cases"], 3);
    assert!(dashboard["token_usage"].as_u64().unwrap() > 0);

    let trace = qa_ok(dir.path(), &["trace", "TC-001"]);
    assert!(trace.contains("SCR-001"), "trace: {trace}");
    assert!(trace.contains("EXE-001"), "trace: {trace}");

    let audit = qa_json(dir.path(), &["audit", "--entity", "TC-001"]);
    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"approve"), "actions: {actions:?}");
    assert!(audit.as_array().unwrap().iter().all(|e| e["actor"] == "qa.lead"));

    let check = qa_ok(dir.path(), &["check"]);
    assert!(check.contains("consistent"), "check: {check}");
}

#[test]
fn test_approving_a_draft_requirement_is_a_precondition_failure() {
    let dir = workspace();
    let out = run_qa(dir.path(), &["req", "approve", "REQ-001"]);
    assert_eq!(out.code, 3, "stderr: {}", out.stderr);

    let requirement = qa_json(dir.path(), &["req", "show", "REQ-001"]);
    assert_eq!(requirement["requirement"]["status"], "draft");
}

#[test]
fn test_stale_expected_version_is_a_conflict() {
    let dir = generated_workspace();
    let out = run_qa(dir.path(), &["case", "approve", "TC-001", "--expect-version", "v2"]);
    assert_eq!(out.code, 4, "stderr: {}", out.stderr);

    let case = qa_json(dir.path(), &["case", "show", "TC-001"]);
    assert_eq!(case["status"], "draft");
}

#[test]
fn test_unknown_entity_is_not_found() {
    let dir = workspace();
    let out = run_qa(dir.path(), &["case", "show", "TC-999"]);
    assert_eq!(out.code, 5, "stderr: {}", out.stderr);

    let out = run_qa(dir.path(), &["trace", "REQ-404"]);
    assert_eq!(out.code, 5, "stderr: {}", out.stderr);
}

#[test]
fn test_invalid_input_is_a_validation_failure() {
    let dir = workspace();
    let out = run_qa(
        dir.path(),
        &[
            "project",
            "create",
            "--name",
            "Broken",
            "--owner",
            "ops@company.com",
            "--token-limit",
            "0",
        ],
    );
    assert_eq!(out.code, 2, "stderr: {}", out.stderr);
}

#[test]
fn test_repeated_token_replays_the_recorded_outcome() {
    let dir = workspace();
    qa_ok(dir.path(), &["req", "analyze", "REQ-001"]);

    let first = qa_json(dir.path(), &["scenario", "generate", "REQ-001", "--token", "nightly-42"]);
    let second = qa_json(dir.path(), &["scenario", "generate", "REQ-001", "--token", "nightly-42"]);
    assert_eq!(first["replayed"], false);
    assert_eq!(second["replayed"], true);
    assert_eq!(first["produced"], second["produced"]);
    assert_eq!(first["tokens_used"], second["tokens_used"]);

    let scenarios = qa_json(dir.path(), &["scenario", "list", "REQ-001"]);
    assert_eq!(
        scenarios.as_array().unwrap().len(),
        first["produced"].as_array().unwrap().len()
    );

    let receipt = qa_json(dir.path(), &["jobs", "--token", "nightly-42"]);
    assert_eq!(receipt["state"], "completed");
}

#[test]
fn test_import_requirements_from_yaml() {
    let dir = workspace();
    std::fs::create_dir_all(dir.path().join("reqs")).unwrap();
    std::fs::write(
        dir.path().join("reqs/login.yml"),
        r#"requirements:
  - title: Login with email
    description: Registered users sign in with email and password.
    acceptance_criteria:
      - Dashboard is shown after sign in
  - title: Password reset
    description: Users can request a password reset link by email.
"#,
    )
    .unwrap();

    let ids = qa_json(dir.path(), &["req", "import", "--project", "PROJ-001", "reqs/*.yml"]);
    assert_eq!(ids, serde_json::json!(["REQ-002", "REQ-003"]));

    let listed = qa_json(dir.path(), &["req", "list", "--project", "PROJ-001"]);
    assert_eq!(listed.as_array().unwrap().len(), 3);

    let out = run_qa(dir.path(), &["req", "import", "--project", "PROJ-001", "missing/*.yml"]);
    assert_ne!(out.code, 0);
}

#[test]
fn test_meta_query_reads_the_saved_ledger() {
    let dir = workspace();
    let rows = qa_json(
        dir.path(),
        &["meta", "query", "SELECT COUNT(*) AS n FROM qa_meta.requirement_versions"],
    );
    assert_eq!(rows, serde_json::json!([{ "n": "1" }]));

    let tables = qa_ok(dir.path(), &["meta", "tables"]);
    assert!(tables.contains("projects"), "tables: {tables}");

    let out = run_qa(dir.path(), &["meta", "query", "DELETE FROM qa_meta.projects"]);
    assert_ne!(out.code, 0);
    assert!(out.stderr.contains("read-only"), "stderr: {}", out.stderr);
}
