//! CLI surface tests. These exercise argument validation only; everything
//! past the fatal-error checks needs real credentials and is covered by the
//! mock-store pipeline tests instead.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn s3_backup() -> Command {
    Command::cargo_bin("s3-backup").expect("binary exists")
}

#[test]
fn help_describes_the_tool() {
    s3_backup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror a local directory tree"));
}

#[test]
fn sync_help_lists_flags() {
    s3_backup()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--dry-run")
                .and(predicate::str::contains("--delete"))
                .and(predicate::str::contains("--exclude"))
                .and(predicate::str::contains("--strategy")),
        );
}

#[test]
fn missing_subcommand_fails() {
    s3_backup().assert().failure();
}

#[test]
fn rejects_non_s3_uri() {
    let dir = tempdir().unwrap();
    s3_backup()
        .arg("sync")
        .arg(dir.path())
        .arg("http://bucket/prefix")
        .assert()
        .failure()
        .stderr(predicate::str::contains("s3://bucket/prefix"));
}

#[test]
fn rejects_missing_local_dir() {
    s3_backup()
        .args(["sync", "definitely/not/a/real/dir", "s3://bucket/prefix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("local_dir not found"));
}
