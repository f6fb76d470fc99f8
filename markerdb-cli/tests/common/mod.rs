#![allow(dead_code)]

use assert_cmd::Command;
use markerdb_test::{sample_entries, write_otu_table};
use std::path::{Path, PathBuf};

pub use markerdb_test::TestEnvironment;

pub fn markerdb_cmd() -> Command {
    let mut cmd = Command::cargo_bin("markerdb").unwrap();
    cmd.env_remove("MARKERDB_CONFIG")
        .env_remove("MARKERDB_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Write the sample OTU table into the environment and return its path
pub fn sample_table(env: &TestEnvironment) -> PathBuf {
    write_otu_table(env.path(), "otus.tsv", &sample_entries())
}

/// Build a database with the fake smafa in `mode`
#[cfg(unix)]
pub fn makedb_with_fake_smafa(
    env: &TestEnvironment,
    db: &Path,
    mode: markerdb_test::FakeSmafaMode,
) -> assert_cmd::assert::Assert {
    let smafa = markerdb_test::write_fake_smafa(env.path(), mode);
    let table = sample_table(env);
    markerdb_cmd()
        .arg("makedb")
        .arg("--otu-table")
        .arg(&table)
        .arg("--db")
        .arg(db)
        .arg("--smafa")
        .arg(&smafa)
        .arg("--timeout-secs")
        .arg("5")
        .assert()
}
