use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::{TempDir, tempdir};

fn soil(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("soil").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(dir.path().join("soil.sqlite"));
    cmd
}

fn run_json(dir: &TempDir, args: &[&str]) -> Value {
    let out = soil(dir).arg("--json").args(args).output().unwrap();
    assert!(
        out.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

fn add_fern(dir: &TempDir) {
    soil(dir)
        .args(["plant", "add", "Fern", "--threshold", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["plant", "list"], 0, "No plants yet.", "stdout")]
#[case(&["weigh", "Ghost", "500"], 3, "does not exist", "stderr")]
#[case(&["weigh"], 2, "required", "stderr")]
#[case(&["delete", "not-an-id"], 2, "rejected", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let assert = soil(&dir).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn weighing_after_watering_reports_loss() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    run_json(&dir, &["weigh", "Fern", "500", "--at", "2025-04-01T08:00"]);
    let water = run_json(&dir, &["water", "Fern", "300", "--at", "2025-04-02T08:00"]);
    assert_eq!(water["measured_weight_g"], Value::Null);
    assert_eq!(water["last_wet_weight_g"], 800);
    assert_eq!(water["water_loss_total_pct"], 0.0);

    let weigh = run_json(&dir, &["weigh", "Fern", "780", "--at", "2025-04-03 08:00:00Z"]);
    assert_eq!(weigh["water_loss_day_g"], 20);
    assert_eq!(weigh["water_loss_total_g"], 20);
    assert_eq!(weigh["water_loss_total_pct"], 6.67);

    let history = run_json(&dir, &["history", "Fern"]);
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["measured_weight_g"], 780);

    let plants = run_json(&dir, &["plant", "list"]);
    assert_eq!(plants[0]["min_dry_weight_g"], 500);
    assert_eq!(plants[0]["max_water_weight_g"], 300);
}

#[test]
fn unparseable_timestamps_are_rejected() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    soil(&dir)
        .args(["weigh", "Fern", "500", "--at", "yesterday"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid measured_at"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let out = soil(&dir)
        .args(["--json", "status", "Ghost"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(v["reason"], "NotFound");
}

#[test]
fn edit_and_delete_round_trip_through_ids() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    let row = run_json(&dir, &["weigh", "Fern", "500", "--at", "2025-04-01T08:00"]);
    let id = row["id"].as_str().unwrap().to_string();

    let edited = run_json(&dir, &["edit", &id, "--weight", "520"]);
    assert_eq!(edited["id"], id.as_str());
    assert_eq!(edited["measured_weight_g"], 520);

    soil(&dir)
        .args(["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));
    soil(&dir).args(["delete", &id]).assert().code(3);
}

#[test]
fn import_records_rows_in_file_order() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    let csv = dir.path().join("readings.csv");
    fs::write(
        &csv,
        "measured_at,measured_weight_g,water_added_g,note\n\
         2025-04-01T08:00,500,,\n\
         2025-04-02T08:00,,300,soaked\n\
         2025-04-03T08:00,780,,\n",
    )
    .unwrap();

    let imported = run_json(&dir, &["import", "Fern", csv.to_str().unwrap()]);
    let rows = imported.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1]["note"], "soaked");
    assert_eq!(rows[2]["water_loss_day_g"], 20);
}

#[test]
fn import_rejects_bad_headers() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    let csv = dir.path().join("readings.csv");
    fs::write(&csv, "when,grams\n2025-04-01T08:00,500\n").unwrap();
    soil(&dir)
        .args(["import", "Fern"])
        .arg(&csv)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("must have headers"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("soil.toml");
    fs::write(&cfg, "[care]\nweighing_interval_hours = 0\n").unwrap();
    soil(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["plant", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn correct_caps_overwatering_then_is_a_no_op() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    for (cmd, grams, at) in [
        ("weigh", "500", "2025-04-01T08:00"),
        ("water", "300", "2025-04-02T08:00"),
        ("weigh", "780", "2025-04-03T08:00"),
        ("weigh", "750", "2025-04-04T08:00"),
        ("water", "400", "2025-04-05T08:00"),
    ] {
        run_json(&dir, &[cmd, "Fern", grams, "--at", at]);
    }

    let planned = run_json(&dir, &["correct", "Fern", "--dry-run"]);
    assert_eq!(planned["updated"], 1);
    assert_eq!(planned["target_weight_g"], 900);

    let applied = run_json(&dir, &["correct", "Fern"]);
    assert_eq!(applied["updated"], 1);
    assert_eq!(applied["total_excess_g"], 250);
    assert_eq!(applied["rows"][0]["new_water_added_g"], 150);

    let again = run_json(&dir, &["correct", "Fern"]);
    assert_eq!(again["updated"], 0);
}

#[test]
fn status_lists_every_active_plant() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    soil(&dir)
        .args(["weigh", "Fern", "500", "--at", "2025-04-01T08:00"])
        .assert()
        .success();
    soil(&dir)
        .args(["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fern:"))
        .stdout(predicate::str::contains("[weigh]"));
}

fn seed_fern(dir: &TempDir) {
    add_fern(dir);
    for (cmd, grams, at) in [
        ("weigh", "500", "2025-04-01T08:00"),
        ("water", "300", "2025-04-02T08:00"),
        ("weigh", "780", "2025-04-03T08:00"),
        ("weigh", "750", "2025-04-04T08:00"),
    ] {
        run_json(dir, &[cmd, "Fern", grams, "--at", at]);
    }
}

#[test]
fn calibration_reports_short_waterings() {
    let dir = tempdir().unwrap();
    seed_fern(&dir);
    run_json(&dir, &["water", "Fern", "200", "--at", "2025-04-05T08:00"]);

    let items = run_json(&dir, &["calibration", "Fern"]);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["target_weight_g"], 800);
    assert_eq!(items[0]["under_g"], 100);
    assert_eq!(items[0]["under_pct"], 33.33);
    assert_eq!(items[1]["under_g"], 0);

    soil(&dir)
        .args(["calibration", "Fern"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-04-05 08:00:00  water 200 g"))
        .stdout(predicate::str::contains("target 800 g  short 100 g (33.33 %)"));
}

#[test]
fn repot_writes_three_rows_and_resets_bounds() {
    let dir = tempdir().unwrap();
    seed_fern(&dir);

    let rows = run_json(
        &dir,
        &[
            "repot",
            "Fern",
            "--old-weight",
            "740",
            "--new-weight",
            "1300",
            "--at",
            "2025-04-05T08:00",
        ],
    );
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["water_loss_day_g"], 10);
    assert_eq!(rows[1]["water_added_g"], 300);
    assert_eq!(rows[2]["last_dry_weight_g"], 1000);

    let history = run_json(&dir, &["history", "Fern"]);
    assert_eq!(history.as_array().unwrap().len(), 7);
    assert_eq!(history[0]["id"], rows[2]["id"]);

    let plants = run_json(&dir, &["plant", "list"]);
    assert_eq!(plants[0]["min_dry_weight_g"], 1000);

    soil(&dir)
        .args(["calibration", "Fern"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No under-watering found."));
    soil(&dir)
        .args(["history", "Fern", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repotting"))
        .stdout(predicate::str::contains("dry=1000 g"));
}

#[test]
fn archived_plants_only_show_with_all() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    let archived = run_json(&dir, &["plant", "archive", "Fern"]);
    assert_eq!(archived["archived"], true);

    soil(&dir)
        .args(["plant", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No plants yet."));
    soil(&dir)
        .args(["plant", "list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(archived)"));
}

#[test]
fn import_with_a_bad_row_writes_nothing() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    let csv = dir.path().join("readings.csv");
    fs::write(
        &csv,
        "measured_at,measured_weight_g,water_added_g,note\n\
         2025-04-01T08:00,500,,\n\
         2025-04-02T08:00,,300,\n\
         yesterday,780,,\n",
    )
    .unwrap();
    soil(&dir)
        .args(["import", "Fern"])
        .arg(&csv)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("line 4"));

    let history = run_json(&dir, &["history", "Fern"]);
    assert!(history.as_array().unwrap().is_empty());
}

#[test]
fn blank_note_clears_an_edited_row() {
    let dir = tempdir().unwrap();
    add_fern(&dir);
    let row = run_json(
        &dir,
        &["weigh", "Fern", "500", "--at", "2025-04-01T08:00", "--note", "dusty"],
    );
    assert_eq!(row["note"], "dusty");
    let id = row["id"].as_str().unwrap().to_string();

    let edited = run_json(&dir, &["edit", &id, "--note", ""]);
    assert_eq!(edited["note"], Value::Null);
}
