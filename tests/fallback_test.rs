use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

const FALLBACK_WARNING: &str = "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage.";

fn command_file() -> tempfile::NamedTempFile {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "type, merchant, amount, currency, reference").unwrap();
    writeln!(csv, "create, 1, 10.00, NGN, F-1").unwrap();
    csv
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let csv = command_file();
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::new(cargo_bin!("payout-service"));
    cmd.env_remove("MERCHANT_SERVICE_URL")
        .env_remove("TRANSACTION_SERVICE_URL")
        .arg(csv.path())
        .arg("--db-path")
        .arg(dir.path().join("some_db"))
        .args(["--sandbox-balance", "10", "--processing-delay-ms", "0"]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(FALLBACK_WARNING))
        .stdout(predicate::str::contains("1,1,F-1,10.00,NGN,processed"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let csv = command_file();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("payout-service"));
    cmd.env_remove("MERCHANT_SERVICE_URL")
        .env_remove("TRANSACTION_SERVICE_URL")
        .arg(csv.path())
        .arg("--db-path")
        .arg(&db_path)
        .args(["--sandbox-balance", "10", "--processing-delay-ms", "0"]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(FALLBACK_WARNING).not());
}
