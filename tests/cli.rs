mod common;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

use common::{LEDGER_CSV, PASSWORD, RESTAURANT, TestWorkspace};

fn dashboard() -> Command {
    let mut cmd = Command::cargo_bin("restaurant-dashboard").expect("binary exists");
    cmd.env_remove("DASHBOARD_PASSWORD");
    cmd
}

#[test]
fn restaurants_lists_configured_sources() {
    let workspace = TestWorkspace::new();
    let (config, _) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args(["restaurants", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Offline Cafe"))
        .stdout(contains("http://127.0.0.1:9/ledger.csv"))
        .stdout(contains(RESTAURANT))
        .stdout(contains("ledger.csv"));
}

#[test]
fn view_prints_filters_rows_and_summaries() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            PASSWORD,
        ])
        .assert()
        .success()
        .stdout(contains("Restaurant: Test Kitchen"))
        .stdout(contains("Warning: 1 row(s) were dropped"))
        .stdout(contains("Users/Guests (userName): all 2 selected"))
        .stdout(contains("Date (Timestamp): 2024-02-01 to 2024-02-03"))
        .stdout(contains("Transactions: 3 of 3 row(s)"))
        .stdout(contains("Total amount per Type/Status (type)"))
        .stdout(contains("Amount share per Users/Guests (userName)"))
        .stdout(contains("66.67%"))
        .stdout(contains("33.33%"))
        .stdout(contains("Carol").not());
}

#[test]
fn view_rejects_wrong_password() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            "guess",
        ])
        .assert()
        .failure()
        .stderr(contains("Incorrect password. Access denied!"))
        .stdout(contains("Transactions").not());
}

#[test]
fn view_reads_password_from_environment() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .env("DASHBOARD_PASSWORD", PASSWORD)
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            "test kitchen",
        ])
        .assert()
        .success()
        .stdout(contains("Restaurant: Test Kitchen"));
}

#[test]
fn view_unknown_restaurant_fails() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            "Nowhere",
            "-p",
            PASSWORD,
        ])
        .assert()
        .failure()
        .stderr(contains("Nowhere"));
}

#[test]
fn view_applies_user_and_date_filters() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            PASSWORD,
            "--user",
            "Alice",
            "--from",
            "2024-02-01",
            "--to",
            "01/02/2024",
        ])
        .assert()
        .success()
        .stdout(contains("Users/Guests (userName): 1 selected: Alice"))
        .stdout(contains("Transactions: 1 of 3 row(s)"))
        .stdout(contains("100.00%"));
}

#[test]
fn deselecting_every_user_leaves_no_rows() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            PASSWORD,
            "--no-users",
        ])
        .assert()
        .success()
        .stdout(contains("Warning: No rows match the current filters"))
        .stdout(contains("Users/Guests (userName): none selected"))
        .stdout(contains("Transactions: 0 of 3 row(s)"))
        .stdout(contains("Total amount per").not());
}

#[test]
fn blank_user_list_is_an_error_not_an_empty_selection() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            PASSWORD,
            "--user",
            ",",
        ])
        .assert()
        .failure()
        .stderr(contains("--no-users"))
        .stdout(contains("Transactions").not());
}

#[test]
fn view_json_reports_groups() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    let output = dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            PASSWORD,
            "--format",
            "json",
            "--category",
            "sale",
        ])
        .output()
        .expect("run view");
    assert!(output.status.success());
    let view: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(view["restaurant"], "Test Kitchen");
    assert_eq!(view["loaded_rows"], 3);
    assert_eq!(view["report"]["dropped_timestamp"], 1);
    let groups = view["by_category"]["groups"].as_array().expect("groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["key"], "sale");
    assert_eq!(groups[0]["rows"], 1);
    assert_eq!(view["options"]["categories"], serde_json::json!(["sale", "refund"]));
}

#[test]
fn view_exports_filtered_rows() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    let export = workspace.path().join("export.csv");
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            PASSWORD,
            "-u",
            "Bob",
            "-o",
            export.to_str().unwrap(),
        ])
        .assert()
        .success();
    let contents = fs::read_to_string(&export).expect("read export");
    let lines = contents.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"userName\""));
    assert!(lines[1].contains("\"Bob\""));
}

#[test]
fn view_input_override_reads_local_file() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    let other = workspace.write(
        "guests.csv",
        "Date;Guest Name;Status;Services\n05/03/2024;Dana;Checked In;120\n06/03/2024;Eli;Cancelled;0\n",
    );
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
            "-p",
            PASSWORD,
            "-i",
            other.to_str().unwrap(),
            "--delimiter",
            ";",
        ])
        .assert()
        .success()
        .stdout(contains("Transactions: 2 of 2 row(s)"))
        .stdout(contains("Total amount per Type/Status (Status)"))
        .stdout(contains("Checked In"));
}

#[test]
fn unreachable_source_is_a_warning_not_a_failure() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "view",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            "Offline Cafe",
            "-p",
            "pw",
        ])
        .assert()
        .success()
        .stdout(contains("Warning: Error loading data"))
        .stdout(contains("Warning: No data loaded or all data filtered out!"))
        .stdout(contains("Transactions").not());
}

#[test]
fn shell_runs_a_scripted_session() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    let export = workspace.path().join("shell-export.csv");
    let script = format!(
        "show\nselect test kitchen\nlogin wrong\nlogin {PASSWORD}\nusers Bob\nshow\nreset\nrefresh\nexport {}\nlogout\nquit\nshow\n",
        export.display()
    );
    dashboard()
        .args([
            "shell",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
        ])
        .write_stdin(script)
        .assert()
        .success()
        .stdout(contains("error: log in first"))
        .stdout(contains("Selected Test Kitchen"))
        .stdout(contains("Incorrect password. Access denied!"))
        .stdout(contains("Access granted to Test Kitchen!"))
        .stdout(contains("Loaded 3 row(s)"))
        .stdout(contains("Users/Guests filter updated"))
        .stdout(contains("Transactions: 1 of 3 row(s)"))
        .stdout(contains("Filters cleared"))
        .stdout(contains("Data refreshed"))
        .stdout(contains("Exported 3 row(s)"))
        .stdout(contains("Logged out"));
    assert!(export.exists());
}

#[test]
fn shell_reports_unknown_commands_and_continues() {
    let workspace = TestWorkspace::new();
    let (config, secrets) = workspace.write_dashboard(LEDGER_CSV);
    dashboard()
        .args([
            "shell",
            "-c",
            config.to_str().unwrap(),
            "-s",
            secrets.to_str().unwrap(),
            "-r",
            RESTAURANT,
        ])
        .write_stdin("dance\nrestaurants\n")
        .assert()
        .success()
        .stdout(contains("Selected Test Kitchen"))
        .stdout(contains("error: Unknown command 'dance'"))
        .stdout(contains("* Test Kitchen"));
}
