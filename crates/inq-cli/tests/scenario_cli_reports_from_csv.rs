//! CLI reports against a CSV export directory (no database).
//!
//! GREEN when:
//! - `report month` prints opening/entries/exits/closing per category as key=value;
//! - `report year` rows chain month to month and the total spans the year so far;
//! - `stock resolve` carries the prior year forward when the year is unconfigured;
//! - `entries list` prints distinct normalized identifiers;
//! - `--json` emits the config hash alongside the report;
//! - `--config` changes the category marker.

use predicates::prelude::*;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// January 2024: ordinary opens at 100 with 20 entries and 15 exits;
/// two deprecated entries, one of them also in the registration log.
fn write_fixture(dir: &Path) {
    let mut cases = String::from("identifier,registered_at,closed_at,state,annotation\n");
    for i in 1..=20 {
        writeln!(cases, "ORD-{i:02}/24,2024-01-{:02},,open,", i).unwrap();
    }
    for i in 1..=15 {
        writeln!(cases, "OLD-{i:02}/23,2023-06-01,2024-01-{:02},closed,", i + 10).unwrap();
    }
    cases.push_str("P-1/24,2024-01-03,,,Carta Precatória\n");
    cases.push_str("P-2/24,2024-01-04,,,precatória n.º 7\n");
    fs::write(dir.join("cases.csv"), cases).unwrap();

    fs::write(
        dir.join("registrations.csv"),
        "identifier,registered_at,annotation\n p-1/24 ,2024-01-20,precatória\n",
    )
    .unwrap();

    fs::write(
        dir.join("fiscal_years.csv"),
        "year,opening_stock_ordinary,opening_stock_deprecated\n2024,100,0\n",
    )
    .unwrap();
}

fn fixture_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    dir
}

#[allow(deprecated)]
fn inq(cwd: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("inq").unwrap();
    cmd.current_dir(cwd).env_remove("INQ_DATABASE_URL");
    cmd
}

#[test]
fn month_report_prints_key_values() {
    let dir = fixture_dir();
    let csv = dir.path().to_str().unwrap();

    inq(dir.path())
        .args(["report", "month", "--year", "2024", "--month", "1", "--csv-dir", csv])
        .assert()
        .success()
        .stdout(predicate::str::contains("source=memory"))
        .stdout(predicate::str::contains("window_from=2024-01-01"))
        .stdout(predicate::str::contains("window_to=2024-01-31"))
        .stdout(predicate::str::contains("ordinary.opening_backlog=100"))
        .stdout(predicate::str::contains("ordinary.entries=20"))
        .stdout(predicate::str::contains("ordinary.exits=15"))
        .stdout(predicate::str::contains("ordinary.closing_backlog=105"))
        .stdout(predicate::str::contains("deprecated.opening_backlog=0"))
        .stdout(predicate::str::contains("deprecated.entries=2"))
        .stdout(predicate::str::contains("deprecated.closing_backlog=2"));
}

#[test]
fn year_report_chains_months() {
    let dir = fixture_dir();
    let csv = dir.path().to_str().unwrap();

    inq(dir.path())
        .args([
            "report",
            "year",
            "--year",
            "2024",
            "--through-month",
            "2",
            "--csv-dir",
            csv,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ordinary.opening_stock=100"))
        .stdout(predicate::str::contains(
            "month=2024-01 category=ordinary opening_backlog=100 entries=20 exits=15 closing_backlog=105",
        ))
        .stdout(predicate::str::contains(
            "month=2024-02 category=ordinary opening_backlog=105 entries=0 exits=0 closing_backlog=105",
        ))
        .stdout(predicate::str::contains(
            "total category=ordinary opening_backlog=100 entries=20 exits=15 closing_backlog=105",
        ))
        .stdout(predicate::str::contains("month=2024-03").not());
}

#[test]
fn stock_resolve_carries_prior_year() {
    let dir = fixture_dir();
    let csv = dir.path().to_str().unwrap();

    inq(dir.path())
        .args(["stock", "resolve", "--year", "2025", "--category", "ordinary", "--csv-dir", csv])
        .assert()
        .success()
        .stdout(predicate::str::contains("configured=false"))
        .stdout(predicate::str::contains("opening_stock=105"));

    inq(dir.path())
        .args(["stock", "resolve", "--year", "2024", "--category", "ordinary", "--csv-dir", csv])
        .assert()
        .success()
        .stdout(predicate::str::contains("configured=true"))
        .stdout(predicate::str::contains("opening_stock=100"));

    inq(dir.path())
        .args(["stock", "resolve", "--year", "2025", "--category", "bogus", "--csv-dir", csv])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid category"));
}

#[test]
fn entries_list_is_distinct_and_normalized() {
    let dir = fixture_dir();
    let csv = dir.path().to_str().unwrap();

    inq(dir.path())
        .args([
            "entries",
            "list",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
            "--category",
            "deprecated",
            "--csv-dir",
            csv,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("entries=2"))
        .stdout(predicate::str::contains("identifier=P-1/24"))
        .stdout(predicate::str::contains("identifier=P-2/24"));

    inq(dir.path())
        .args([
            "entries",
            "list",
            "--from",
            "2024-02-01",
            "--to",
            "2024-01-01",
            "--category",
            "ordinary",
            "--csv-dir",
            csv,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WINDOW_INVALID"));
}

#[test]
fn json_output_is_stamped_with_config_hash() {
    let dir = fixture_dir();
    let csv = dir.path().to_str().unwrap();

    let out = inq(dir.path())
        .args([
            "report", "month", "--year", "2024", "--month", "1", "--csv-dir", csv, "--json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["config_hash"].as_str().unwrap().len(), 64);
    assert_eq!(v["source"], "memory");
    assert_eq!(v["window"]["from"], "2024-01-01");
    assert_eq!(v["ordinary"]["closing_backlog"], 105);
    assert_eq!(v["deprecated"]["entries"], 2);
}

#[test]
fn config_marker_changes_classification() {
    let dir = fixture_dir();
    let csv = dir.path().to_str().unwrap();
    let cfg = dir.path().join("marker.yaml");
    fs::write(&cfg, "classification:\n  deprecated_marker: \"n.º 7\"\n").unwrap();

    inq(dir.path())
        .args([
            "report",
            "month",
            "--year",
            "2024",
            "--month",
            "1",
            "--csv-dir",
            csv,
            "--config",
            cfg.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("deprecated.entries=1"))
        .stdout(predicate::str::contains("ordinary.entries=21"));
}

#[test]
fn missing_cases_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    inq(dir.path())
        .args([
            "report",
            "month",
            "--year",
            "2024",
            "--month",
            "1",
            "--csv-dir",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cases.csv"));
}
