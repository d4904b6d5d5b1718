//! Integration tests for the rnc CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use chrono::{Datelike, Local};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PASSWORD: &str = "s3cret";

/// Helper to get an rnc command isolated from the caller's environment
fn rnc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rnc").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env("HOME", dir)
        .env("RNC_QUALITY_PASS", PASSWORD)
        .env("RNC_PASSWORD", PASSWORD)
        .env("RNC_AUTHOR", "Inspector")
        .env_remove("RNC_DATABASE_URL")
        .env_remove("RNC_BACKEND")
        .env_remove("RNC_STORAGE_DIR")
        .env_remove("RNC_PUBLIC_URL")
        .env_remove("RNC_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    rnc(tmp.path()).arg("init").assert().success();
    tmp
}

/// Helper to register an RNC and return its number
fn create_rnc(tmp: &TempDir, title: &str) -> String {
    let output = rnc(tmp.path())
        .args(["new", "--title", title, "--area", "Warehouse", "-f", "id"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn number(seq: u32) -> String {
    format!("{}-{:03}", Local::now().year(), seq)
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();
    rnc(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized RNC project"));

    assert!(tmp.path().join(".rnc").is_dir());
    assert!(tmp.path().join(".rnc/config.yaml").is_file());
    assert!(tmp.path().join(".rnc/rnc.db").is_file());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    rnc(tmp.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an RNC project"));
}

// ============================================================================
// Record Tests
// ============================================================================

#[test]
fn test_new_assigns_sequential_numbers() {
    let tmp = setup_test_project();
    assert_eq!(create_rnc(&tmp, "Cracked pallet"), number(1));
    assert_eq!(create_rnc(&tmp, "Missing label"), number(2));
}

#[test]
fn test_list_and_show() {
    let tmp = setup_test_project();
    let first = create_rnc(&tmp, "Cracked pallet");
    create_rnc(&tmp, "Missing label");

    rnc(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cracked pallet"))
        .stdout(predicate::str::contains("Missing label"))
        .stdout(predicate::str::contains("2 RNC(s) found"));

    rnc(tmp.path())
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("2\n");

    rnc(tmp.path())
        .args(["show", &first])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cracked pallet"))
        .stdout(predicate::str::contains("Warehouse"))
        .stdout(predicate::str::contains("Inspector"));
}

#[test]
fn test_list_newest_first_in_id_format() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "First");
    create_rnc(&tmp, "Second");

    rnc(tmp.path())
        .args(["list", "-f", "id"])
        .assert()
        .success()
        .stdout(format!("{}\n{}\n", number(2), number(1)));
}

#[test]
fn test_show_json_has_record_fields() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Leaking valve");

    let output = rnc(tmp.path())
        .args(["show", &n, "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["number"], n.as_str());
    assert_eq!(json["title"], "Leaking valve");
    assert_eq!(json["status"], "open");
}

#[test]
fn test_show_unknown_number_fails() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .args(["show", &number(42)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_show_invalid_number_fails() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .args(["show", "banana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid RNC number"));
}

#[test]
fn test_edit_updates_fields() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Old title");

    rnc(tmp.path())
        .args(["edit", &n, "--title", "New title", "--pep", "PEP-7"])
        .assert()
        .success();

    rnc(tmp.path())
        .args(["show", &n])
        .assert()
        .success()
        .stdout(predicate::str::contains("New title"))
        .stdout(predicate::str::contains("PEP-7"));
}

#[test]
fn test_edit_without_fields_fails() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Unchanged");
    rnc(tmp.path())
        .args(["edit", &n])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to edit"));
}

// ============================================================================
// Workflow Tests
// ============================================================================

#[test]
fn test_close_reopen_cancel() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Bent rail");

    rnc(tmp.path())
        .args(["close", &n, "-m", "replaced"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Closed"));

    rnc(tmp.path())
        .args(["reopen", &n])
        .assert()
        .success()
        .stdout(predicate::str::contains("in_progress"));

    rnc(tmp.path())
        .args(["cancel", &n])
        .assert()
        .success();

    rnc(tmp.path())
        .args(["list", "--status", "cancelled", "-f", "id"])
        .assert()
        .success()
        .stdout(format!("{}\n", n));

    rnc(tmp.path())
        .args(["show", &n])
        .assert()
        .success()
        .stdout(predicate::str::contains("History"))
        .stdout(predicate::str::contains("replaced"));
}

#[test]
fn test_invalid_transition_fails() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Loose bolt");

    rnc(tmp.path())
        .args(["reopen", &n])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot reopen"));
}

// ============================================================================
// Authorization Tests
// ============================================================================

#[test]
fn test_wrong_password_rejected() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .args(["new", "--title", "Nope", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("incorrect quality password"));

    rnc(tmp.path())
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_missing_password_rejected() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .env_remove("RNC_PASSWORD")
        .args(["new", "--title", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires the quality role"));
}

#[test]
fn test_unconfigured_password_rejected() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .env_remove("RNC_QUALITY_PASS")
        .args(["new", "--title", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn test_reads_do_not_need_password() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Readable");
    rnc(tmp.path())
        .env_remove("RNC_PASSWORD")
        .args(["show", &n])
        .assert()
        .success();
}

// ============================================================================
// Delete Tests
// ============================================================================

#[test]
fn test_delete_requires_confirmation() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Doomed");

    rnc(tmp.path())
        .args(["delete", &n])
        .assert()
        .failure()
        .stderr(predicate::str::contains("without confirmation"));

    rnc(tmp.path())
        .args(["delete", &n, "--yes"])
        .assert()
        .success();

    rnc(tmp.path()).args(["show", &n]).assert().failure();
}

#[test]
fn test_delete_does_not_reuse_number() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "One");
    let second = create_rnc(&tmp, "Two");

    rnc(tmp.path())
        .args(["delete", &second, "--yes"])
        .assert()
        .success();

    assert_eq!(create_rnc(&tmp, "Three"), number(3));
}

// ============================================================================
// Photo Tests
// ============================================================================

#[test]
fn test_photo_add_list_get_rm() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Scratched panel");
    let photo = tmp.path().join("panel.jpg");
    fs::write(&photo, b"\xff\xd8\xff fake jpeg").unwrap();

    let output = rnc(tmp.path())
        .args(["-q", "photo", "add", &n, "panel.jpg", "--category", "opening"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert!(key.starts_with(&format!("photos/{}/opening/", n)));

    rnc(tmp.path())
        .args(["photo", "list", &n, "-f", "id"])
        .assert()
        .success()
        .stdout(format!("{}\n", key));

    rnc(tmp.path())
        .args(["photo", "get", &n, &key, "-o", "copy.jpg"])
        .assert()
        .success();
    assert_eq!(
        fs::read(tmp.path().join("copy.jpg")).unwrap(),
        b"\xff\xd8\xff fake jpeg"
    );

    rnc(tmp.path())
        .args(["photo", "rm", &n, &key])
        .assert()
        .success();

    rnc(tmp.path())
        .args(["photo", "list", &n])
        .assert()
        .success()
        .stdout(predicate::str::contains("No photos"));
}

#[test]
fn test_photo_keeps_uploaded_name() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Porous weld");
    fs::write(tmp.path().join("solda ação.jpg"), b"jpeg").unwrap();

    let output = rnc(tmp.path())
        .args(["-q", "photo", "add", &n, "solda ação.jpg"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert!(key.ends_with("_solda_a__o.jpg"));

    rnc(tmp.path())
        .args(["photo", "list", &n])
        .assert()
        .success()
        .stdout(predicate::str::contains("solda ação.jpg"));

    // Default download path is the key-safe name
    fs::remove_file(tmp.path().join("solda ação.jpg")).unwrap();
    rnc(tmp.path())
        .args(["photo", "get", &n, &key])
        .assert()
        .success();
    assert_eq!(fs::read(tmp.path().join("solda_a__o.jpg")).unwrap(), b"jpeg");
}

#[test]
fn test_list_csv_format() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Pallet, cracked");

    let output = rnc(tmp.path())
        .args(["list", "-f", "csv"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let mut rdr = csv::Reader::from_reader(output.stdout.as_slice());
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], n.as_str());
    assert_eq!(&rows[0][5], "Pallet, cracked");
}

#[test]
fn test_photo_add_to_missing_rnc_fails() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("x.png"), b"png").unwrap();
    rnc(tmp.path())
        .args(["photo", "add", &number(9), "x.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ============================================================================
// CSV Tests
// ============================================================================

#[test]
fn test_export_import_round_trip() {
    let source = setup_test_project();
    create_rnc(&source, "Cracked pallet");
    let closed = create_rnc(&source, "Missing label");
    rnc(source.path()).args(["close", &closed]).assert().success();

    let csv_path = source.path().join("out.csv");
    rnc(source.path())
        .args(["export", "-o", csv_path.to_str().unwrap()])
        .assert()
        .success();
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("number,reporter,date,area,cost_code,title,description,status"));
    assert!(csv.contains("Cracked pallet"));

    let target = setup_test_project();
    rnc(target.path())
        .args(["import", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("RNCs created:   2"));

    rnc(target.path())
        .args(["list", "--status", "closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Missing label"));
}

#[test]
fn test_import_dry_run_creates_nothing() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join("in.csv"),
        "title,reporter,date,area\nLoose cable,Ana,2025-03-01,Plant A\n",
    )
    .unwrap();

    rnc(tmp.path())
        .args(["import", "in.csv", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid rows:     1"));

    rnc(tmp.path())
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_import_bad_row_aborts_without_skip() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join("in.csv"),
        "title,date\nGood row,2025-03-01\nBad row,not-a-date\n",
    )
    .unwrap();

    rnc(tmp.path())
        .args(["import", "in.csv"])
        .assert()
        .failure();
    rnc(tmp.path())
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("0\n");

    rnc(tmp.path())
        .args(["import", "in.csv", "--skip-errors"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Row 3"));
    rnc(tmp.path())
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_import_template() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .args(["import", "--template"])
        .assert()
        .success()
        .stdout(predicate::str::contains("title"));
}

// ============================================================================
// PDF / Report / Status Tests
// ============================================================================

#[test]
fn test_pdf_writes_file() {
    let tmp = setup_test_project();
    let n = create_rnc(&tmp, "Dented door");

    rnc(tmp.path()).args(["pdf", &n]).assert().success();
    let bytes = fs::read(tmp.path().join(format!("RNC_{}.pdf", n))).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn test_report_and_status() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "One");
    let n = create_rnc(&tmp, "Two");
    rnc(tmp.path()).args(["close", &n]).assert().success();

    rnc(tmp.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Warehouse"));

    rnc(tmp.path()).arg("status").assert().success();
}

// ============================================================================
// Backend / Config Tests
// ============================================================================

#[test]
fn test_json_backend() {
    let tmp = setup_test_project();
    let run = |args: &[&str]| {
        let mut cmd = rnc(tmp.path());
        cmd.env("RNC_BACKEND", "json").args(args);
        cmd
    };

    let output = run(&["new", "--title", "Json record", "-f", "id"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), number(1));
    assert!(tmp.path().join(".rnc/objects/rnc/records.json").is_file());

    run(&["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Json record"));

    // The SQL backend keeps its own records
    rnc(tmp.path())
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_config_show_masks_password() {
    let tmp = setup_test_project();
    rnc(tmp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains(PASSWORD).not());

    rnc(tmp.path())
        .args(["config", "show", "author"])
        .assert()
        .success()
        .stdout("Inspector\n");
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();
    rnc(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rnc"));
}
