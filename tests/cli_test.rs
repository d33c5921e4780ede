use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn round_trip_test(method: &str,dat: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let orig_path = temp_dir.path().join("original");
    let packed_path = temp_dir.path().join("packed");
    let restored_path = temp_dir.path().join("restored");
    std::fs::write(&orig_path,dat)?;
    let mut cmd = Command::cargo_bin("compactor")?;
    cmd.arg("compress")
        .arg("-m").arg(method)
        .arg("-i").arg(&orig_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("compactor")?;
    cmd.arg("expand")
        .arg("-m").arg(method)
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&restored_path)
        .assert()
        .success();
    match (std::fs::read(&orig_path),std::fs::read(&restored_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with original")
    }
    Ok(())
}

fn sample_text() -> Vec<u8> {
    "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(8).into_bytes()
}

fn sample_runs() -> Vec<u8> {
    let mut dat = vec![0x00;400];
    dat.extend_from_slice(&[0x41;120]);
    dat.extend_from_slice(b"short tail");
    dat
}

#[test]
fn huffman_round_trip() -> STDRESULT {
    round_trip_test("huffman",&sample_text())?;
    round_trip_test("huffman",&sample_runs())
}

#[test]
fn rle_round_trip() -> STDRESULT {
    round_trip_test("rle",&sample_text())?;
    round_trip_test("rle",&sample_runs())
}

#[test]
fn lz77_round_trip() -> STDRESULT {
    round_trip_test("lz77",&sample_text())?;
    round_trip_test("lz77",&sample_runs())
}

#[test]
fn analyze_reports_recommendation() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("runs");
    std::fs::write(&path,sample_runs())?;
    let mut cmd = Command::cargo_bin("compactor")?;
    cmd.arg("analyze")
        .arg("-m").arg("rle")
        .arg("-i").arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("recommendation"))
        .stdout(predicate::str::contains("good compression"));
    Ok(())
}

#[test]
fn expand_rejects_foreign_file() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("fake.png");
    let out_path = temp_dir.path().join("out");
    std::fs::write(&path,[0x89,0x50,0x4E,0x47,0x0D,0x0A,0x1A,0x0A])?;
    let mut cmd = Command::cargo_bin("compactor")?;
    cmd.arg("expand")
        .arg("-m").arg("huffman")
        .arg("-i").arg(&path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("PNG"));
    Ok(())
}

#[test]
fn compress_honors_tuning_flags() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let orig_path = temp_dir.path().join("original");
    let packed_path = temp_dir.path().join("packed");
    let restored_path = temp_dir.path().join("restored");
    std::fs::write(&orig_path,sample_text())?;
    let mut cmd = Command::cargo_bin("compactor")?;
    cmd.arg("compress")
        .arg("-m").arg("lz77")
        .arg("-i").arg(&orig_path)
        .arg("-o").arg(&packed_path)
        .arg("--window").arg("128")
        .arg("--lookahead").arg("10")
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("compactor")?;
    cmd.arg("expand")
        .arg("-m").arg("lz77")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&restored_path)
        .assert()
        .success();
    assert_eq!(std::fs::read(&restored_path)?,sample_text());
    let mut cmd = Command::cargo_bin("compactor")?;
    cmd.arg("compress")
        .arg("-m").arg("lz77")
        .arg("-i").arg(&orig_path)
        .arg("-o").arg(&packed_path)
        .arg("--window").arg("40000")
        .assert()
        .failure();
    Ok(())
}
