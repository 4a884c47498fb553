use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_csv_handling() {
    let output_path = std::path::PathBuf::from("robustness_test.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(["event", "at", "payload", "amount", "note", "tag", "state", "decision"])
        .unwrap();

    wtr.write_record(["scan", "1700000000000", "upi://pay?pa=x@bank", "", "", "", "", ""])
        .unwrap();
    // Unknown event type
    wtr.write_record(["teleport", "1700000000500", "", "", "", "", "", ""])
        .unwrap();
    // Invalid amount and no tag
    wtr.write_record(["proceed", "1700000001000", "", "0", "", "", "", ""])
        .unwrap();
    // Lifecycle event without a state
    wtr.write_record(["lifecycle", "1700000001500", "", "", "", "", "", ""])
        .unwrap();
    // Corrected form
    wtr.write_record(["proceed", "1700000002000", "", "12.5", "bus", "Transport", "", ""])
        .unwrap();
    wtr.write_record(["lifecycle", "1700000003000", "", "", "", "", "inactive", ""])
        .unwrap();
    wtr.write_record(["lifecycle", "1700000004000", "", "", "", "", "active", ""])
        .unwrap();
    wtr.write_record(["decide", "1700000005000", "", "", "", "", "", "yes"])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("spendscan"));
    cmd.arg(&output_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stderr(predicate::str::contains("Amount is compulsory"))
        .stderr(predicate::str::contains("Please select a tag"))
        .stdout(predicate::str::contains("1,12.5,bus,Transport,"));

    std::fs::remove_file(output_path).ok();
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("spendscan"));
    cmd.arg("does/not/exist.csv");
    cmd.assert().failure();
}
