//! Durability and recovery tests
//!
//! - Committed operations survive reopen
//! - Recovery rebuilds versions, history and restricted collections
//! - Corruption of the frame log halts open, never ignored

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use assetledger::access::AccessPolicy;
use assetledger::ledger::{Ledger, LedgerErrorKind};
use assetledger::observability::FileAuditLog;
use assetledger::storage::{FileMedium, StateStore};
use common::*;
use serde_json::Value;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn open_ledger(data_dir: &Path) -> Ledger {
    let medium = FileMedium::open(data_dir).unwrap();
    Ledger::open(Box::new(medium), Arc::new(AccessPolicy::default())).unwrap()
}

fn state_file(data_dir: &Path) -> std::path::PathBuf {
    data_dir.join("ledger").join("state.dat")
}

// =============================================================================
// Reopen
// =============================================================================

#[test]
fn test_committed_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut ledger = open_ledger(temp_dir.path());
        submit_ok(&mut ledger, &create_car("V1", "Red"));
        submit_ok(&mut ledger, &create_order("O1", "Red", "Dealer9"));
        submit_ok(&mut ledger, &create_car("V2", "Blue"));
        submit_ok(&mut ledger, &car("MatchOrder", factory(), &["V1", "O1"]));
        submit_ok(&mut ledger, &car("DeleteCar", factory(), &["V2"]));
    }

    let mut ledger = open_ledger(temp_dir.path());
    assert_eq!(ledger.store().last_sequence(), 5);

    let v1 = read(&ledger, &car("ReadCar", registrar(), &["V1"]));
    assert_eq!(v1["ownedBy"], "Dealer9");
    assert_eq!(v1["status"], "AssignedToDealer");

    let v2 = read(&ledger, &car("CarExists", registrar(), &["V2"]));
    assert_eq!(v2, Value::Bool(false));
    let o1 = read(&ledger, &call("OrderContract", "OrderExists", dealer(), &["O1"]));
    assert_eq!(o1, Value::Bool(false));

    let history = read(&ledger, &car("GetCarHistory", registrar(), &["V2"]));
    assert_eq!(history.as_array().unwrap().len(), 2);

    // Sequences continue after recovery
    let response = submit_ok(&mut ledger, &create_car("V3", "Green"));
    assert_eq!(response.sequence, Some(6));
}

#[test]
fn test_rejected_operations_leave_no_frames() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut ledger = open_ledger(temp_dir.path());
        submit_ok(&mut ledger, &create_car("V1", "Red"));
        submit_err(&mut ledger, &car("DeleteCar", dealer(), &["V1"]));
        submit_err(&mut ledger, &create_car("V1", "Red"));
        ledger.evaluate(&create_car("V9", "Red")).unwrap();
    }

    let ledger = open_ledger(temp_dir.path());
    assert_eq!(ledger.store().last_sequence(), 1);
    let exists = read(&ledger, &car("CarExists", registrar(), &["V9"]));
    assert_eq!(exists, Value::Bool(false));
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_corrupt_frame_halts_open() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut ledger = open_ledger(temp_dir.path());
        submit_ok(&mut ledger, &create_car("V1", "Red"));
        submit_ok(&mut ledger, &create_car("V2", "Red"));
    }

    let path = state_file(temp_dir.path());
    let mut contents = fs::read(&path).unwrap();
    let last = contents.len() - 3;
    contents[last] ^= 0xFF;
    fs::write(&path, contents).unwrap();

    let medium = FileMedium::open(temp_dir.path()).unwrap();
    let err = StateStore::open(Box::new(medium)).err().unwrap();
    assert!(err.is_fatal(), "corruption must be fatal: {}", err);
    assert!(err.to_string().contains("LEDGER_DATA_CORRUPTION"));

    let medium = FileMedium::open(temp_dir.path()).unwrap();
    let err = Ledger::open(Box::new(medium), Arc::new(AccessPolicy::default())).err().unwrap();
    assert_kind(&err, LedgerErrorKind::StoreUnavailable);
    assert!(err.message().contains("LEDGER_DATA_CORRUPTION"));
}

#[test]
fn test_truncated_log_is_detected() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut ledger = open_ledger(temp_dir.path());
        submit_ok(&mut ledger, &create_car("V1", "Red"));
    }

    let path = state_file(temp_dir.path());
    let contents = fs::read(&path).unwrap();
    fs::write(&path, &contents[..contents.len() / 2]).unwrap();

    let medium = FileMedium::open(temp_dir.path()).unwrap();
    assert!(StateStore::open(Box::new(medium)).is_err());
}

// =============================================================================
// Audit trail
// =============================================================================

#[test]
fn test_audit_trail_records_outcomes_without_arguments() {
    let temp_dir = TempDir::new().unwrap();
    let audit_path = temp_dir.path().join("audit.log");

    {
        let audit = FileAuditLog::open(&audit_path).unwrap();
        let mut ledger = open_ledger(temp_dir.path()).with_audit(Arc::new(audit));
        submit_ok(&mut ledger, &create_order("O1", "Red", "SecretDealer"));
        submit_err(&mut ledger, &car("DeleteCar", dealer(), &["V1"]));
        submit_err(&mut ledger, &car("ReadCar", dealer(), &["V1"]));
    }

    let contents = fs::read_to_string(&audit_path).unwrap();
    assert!(!contents.contains("SecretDealer"));

    let records: Vec<Value> = contents.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    let outcomes: Vec<_> = records.iter().map(|r| r["outcome"].as_str().unwrap()).collect();
    assert_eq!(outcomes, vec!["SUCCESS", "REJECTED", "FAILED"]);
    assert_eq!(records[0]["sequence"], 1);
    assert_eq!(records[1]["error_code"], "LEDGER_UNAUTHORIZED");
    assert_eq!(records[2]["error_code"], "LEDGER_NOT_FOUND");
    assert_eq!(records[1]["org"], "Dealer");
}
