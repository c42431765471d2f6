//! Operator CLI smoke tests.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_config(dir: &tempfile::TempDir) -> PathBuf {
    let db_path = dir.path().join("store.db");
    let config_path = dir.path().join("stockroom.toml");
    fs::write(
        &config_path,
        format!(
            "[database]\nurl = \"{}\"\nmax_connections = 2\n\n[logging]\nlevel = \"error\"\nformat = \"pretty\"\n",
            db_path.display()
        ),
    )
    .expect("write config");
    config_path
}

#[test]
fn sweep_reports_zero_on_a_fresh_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir);

    Command::cargo_bin("stockroom")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("Released 0 expired reservation(s)."));
}

#[test]
fn reservations_and_orders_are_empty_on_a_fresh_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir);

    Command::cargo_bin("stockroom")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .arg("reservations")
        .assert()
        .success()
        .stdout(predicate::str::contains("No active reservations."));

    Command::cargo_bin("stockroom")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .arg("orders")
        .assert()
        .success()
        .stdout(predicate::str::contains("No orders."));
}

#[test]
fn availability_fails_for_an_unknown_variant() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir);

    Command::cargo_bin("stockroom")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .arg("availability")
        .arg("ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("variant not found: ghost"));
}

#[test]
fn rejects_an_invalid_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("stockroom.toml");
    fs::write(&config_path, "[hold]\nhours = 0\n").expect("write config");

    Command::cargo_bin("stockroom")
        .expect("binary")
        .arg("--config")
        .arg(&config_path)
        .arg("sweep")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for hours"));
}
