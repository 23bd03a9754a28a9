use std::fs;
use std::io::{Cursor, Write};

use assert_cmd::Command;
use predicates::prelude::*;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Test that `members` lists every shapefile member
#[test]
fn test_members_command() -> TestResult {
    Command::cargo_bin("shapeload")?
        .arg("members")
        .assert()
        .success()
        .stdout(predicate::str::contains(".shp"))
        .stdout(predicate::str::contains(".cpg"))
        .stdout(predicate::str::contains("Required"));
    Ok(())
}

/// Test `info` on a directory of sibling files
#[test]
fn test_info_local_dataset() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("roads.shp"), [0u8; 8])?;
    fs::write(dir.path().join("roads.dbf"), [0u8; 4])?;
    fs::write(dir.path().join("roads.prj"), "EPSG:4326")?;

    Command::cargo_bin("shapeload")?
        .arg("info")
        .arg(dir.path().join("roads.shp"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Input: url"))
        .stdout(predicate::str::contains("+proj=longlat"));
    Ok(())
}

/// Test `info --archive` on a zip holding only geometry
#[test]
fn test_info_archive() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("roads.shp", SimpleFileOptions::default())?;
    writer.write_all(&[0u8; 8])?;
    let archive = dir.path().join("roads.zip");
    fs::write(&archive, writer.finish()?.into_inner())?;

    Command::cargo_bin("shapeload")?
        .args(["info", "--archive"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Input: archive"))
        .stdout(predicate::str::contains("absent"));
    Ok(())
}

/// Test that a dataset without geometry fails with a hint
#[test]
fn test_info_missing_geometry() -> TestResult {
    let dir = tempfile::tempdir()?;

    Command::cargo_bin("shapeload")?
        .arg("info")
        .arg(dir.path().join("missing.shp"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .shp geometry found"));
    Ok(())
}
