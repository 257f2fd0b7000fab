//! Ledger invariant tests
//!
//! - History replay reconstructs the current value
//! - Denied mutations never change state and never reveal existence
//! - MatchOrder is all-or-nothing
//! - Store failures abort with no partial writes and are retryable

mod common;

use std::sync::Arc;

use assetledger::access::{AccessPolicy, Credential};
use assetledger::contracts::{Car, HistoryRecord};
use assetledger::ledger::{Invocation, Ledger, LedgerErrorKind};
use assetledger::storage::{MemoryMedium, Partition, StateStore, UnitOfWork};
use common::*;
use serde_json::{json, Value};

// =============================================================================
// Test Utilities
// =============================================================================

fn car_history(ledger: &Ledger, id: &str) -> Vec<HistoryRecord<Car>> {
    serde_json::from_value(read(ledger, &car("GetCarHistory", registrar(), &[id]))).unwrap()
}

fn current_car(ledger: &Ledger, id: &str) -> Option<Car> {
    match ledger.evaluate(&car("ReadCar", registrar(), &[id])) {
        Ok(response) => Some(serde_json::from_value(response.payload).unwrap()),
        Err(e) => {
            assert_kind(&e, LedgerErrorKind::NotFound);
            None
        }
    }
}

// =============================================================================
// History replay
// =============================================================================

#[test]
fn test_history_replay_reconstructs_current_value() {
    let (mut ledger, _) = memory_ledger();
    let steps: Vec<Invocation> = vec![
        create_car("V1", "Red"),
        create_order("O1", "Red", "Dealer9"),
        car("MatchOrder", factory(), &["V1", "O1"]),
        car("RegisterCar", registrar(), &["V1", "Alice", "KL-01-1234"]),
        car("DeleteCar", factory(), &["V1"]),
        create_car("V1", "Red"),
        car("RegisterCar", registrar(), &["V1", "Bob", "KL-07-0007"]),
    ];

    for (i, step) in steps.iter().enumerate() {
        submit_ok(&mut ledger, step);

        let replayed = car_history(&ledger, "V1")
            .into_iter()
            .fold(None, |_, entry| entry.record);
        assert_eq!(replayed, current_car(&ledger, "V1"), "after step {}", i);
    }

    let history = car_history(&ledger, "V1");
    assert_eq!(history.len(), 6);
    assert_eq!(history.iter().filter(|h| h.is_delete).count(), 1);
    assert!(history[3].is_delete && history[3].record.is_none());
}

#[test]
fn test_history_of_unknown_key_is_empty() {
    let (ledger, _) = memory_ledger();
    assert_eq!(read(&ledger, &car("GetCarHistory", registrar(), &["V404"])), Value::Array(vec![]));
}

#[test]
fn test_history_carries_writer_tx_ids() {
    let (mut ledger, _) = memory_ledger();
    let first = submit_ok(&mut ledger, &create_car("V1", "Red"));
    let second = submit_ok(&mut ledger, &car("RegisterCar", registrar(), &["V1", "Alice", "P-1"]));

    let tx_ids: Vec<_> = car_history(&ledger, "V1").into_iter().map(|h| h.tx_id).collect();
    assert_eq!(tx_ids, vec![first.tx_id, second.tx_id]);
}

// =============================================================================
// Access control
// =============================================================================

#[test]
fn test_denied_mutations_never_alter_state() {
    let (mut ledger, _) = memory_ledger();
    submit_ok(&mut ledger, &create_car("V1", "Red"));
    let snapshot = current_car(&ledger, "V1");
    let sequence = ledger.store().last_sequence();

    let intruders = [dealer(), registrar(), farmer(), Credential::new("factory", "lowercase")];
    for who in intruders {
        for id in ["V1", "V404"] {
            let create = car("CreateCar", who.clone(), &[id, "Toyota", "Corolla", "Red", "X", "2024-01-01"]);
            let delete = car("DeleteCar", who.clone(), &[id]);
            for inv in [create, delete] {
                let err = submit_err(&mut ledger, &inv);
                assert_kind(&err, LedgerErrorKind::Unauthorized);
            }
        }
    }

    for who in [factory(), dealer(), farmer()] {
        let err = submit_err(&mut ledger, &car("RegisterCar", who, &["V1", "Mallory", "STOLEN"]));
        assert_kind(&err, LedgerErrorKind::Unauthorized);
    }

    assert_eq!(ledger.store().last_sequence(), sequence);
    assert_eq!(current_car(&ledger, "V1"), snapshot);
}

#[test]
fn test_denial_does_not_reveal_existence() {
    let (mut ledger, _) = memory_ledger();
    submit_ok(&mut ledger, &create_car("V1", "Red"));

    let existing = submit_err(&mut ledger, &car("DeleteCar", dealer(), &["V1"]));
    let missing = submit_err(&mut ledger, &car("DeleteCar", dealer(), &["V404"]));
    assert_eq!(existing, missing);
    assert!(existing.message().contains("Dealer"));
}

#[test]
fn test_unresolved_credential_is_rejected() {
    let (mut ledger, _) = memory_ledger();
    let err = submit_err(&mut ledger, &car("CarExists", Credential::new("", ""), &["V1"]));
    assert_kind(&err, LedgerErrorKind::Unauthorized);
}

// =============================================================================
// MatchOrder atomicity
// =============================================================================

#[test]
fn test_match_order_all_or_nothing() {
    let (mut ledger, _) = memory_ledger();
    submit_ok(&mut ledger, &create_car("V1", "Red"));
    submit_ok(&mut ledger, &create_order("O1", "Red", "Dealer9"));
    submit_ok(&mut ledger, &car("RegisterCar", registrar(), &["V1", "Alice", "P-1"]));
    let sequence = ledger.store().last_sequence();

    // Registered cars cannot be reassigned
    let err = submit_err(&mut ledger, &car("MatchOrder", factory(), &["V1", "O1"]));
    assert_kind(&err, LedgerErrorKind::NoMatch);

    // Caller outside the order collection
    let err = submit_err(&mut ledger, &car("MatchOrder", registrar(), &["V1", "O1"]));
    assert_kind(&err, LedgerErrorKind::Unauthorized);

    // Missing counterpart on either side
    let err = submit_err(&mut ledger, &car("MatchOrder", factory(), &["V404", "O1"]));
    assert_kind(&err, LedgerErrorKind::NotFound);
    let err = submit_err(&mut ledger, &car("MatchOrder", factory(), &["V1", "O404"]));
    assert_kind(&err, LedgerErrorKind::NotFound);

    assert_eq!(ledger.store().last_sequence(), sequence);
    let order = read(&ledger, &call("OrderContract", "OrderExists", dealer(), &["O1"]));
    assert_eq!(order, Value::Bool(true));
    assert_eq!(current_car(&ledger, "V1").unwrap().owned_by, "Alice");
}

#[test]
fn test_match_order_commits_one_frame() {
    let (mut ledger, _) = memory_ledger();
    submit_ok(&mut ledger, &create_car("V1", "Red"));
    submit_ok(&mut ledger, &create_order("O1", "Red", "Dealer9"));

    let response = submit_ok(&mut ledger, &car("MatchOrder", factory(), &["V1", "O1"]));
    assert_eq!(response.sequence, Some(3));
    assert_eq!(ledger.store().last_sequence(), 3);
}

#[test]
fn test_match_order_append_failure_keeps_order_and_car() {
    let (mut ledger, medium) = memory_ledger();
    submit_ok(&mut ledger, &create_car("V1", "Red"));
    submit_ok(&mut ledger, &create_order("O1", "Red", "Dealer9"));
    let sequence = ledger.store().last_sequence();
    let before = current_car(&ledger, "V1");

    // The contract body runs to completion; only the frame append fails.
    medium.fail_next_append();
    let err = submit_err(&mut ledger, &car("MatchOrder", factory(), &["V1", "O1"]));
    assert_kind(&err, LedgerErrorKind::StoreUnavailable);
    assert!(err.is_retryable());

    assert_eq!(ledger.store().last_sequence(), sequence);
    let order = read(&ledger, &call("OrderContract", "OrderExists", dealer(), &["O1"]));
    assert_eq!(order, Value::Bool(true));
    assert_eq!(current_car(&ledger, "V1"), before);

    // The same operation succeeds once the medium accepts appends again
    submit_ok(&mut ledger, &car("MatchOrder", factory(), &["V1", "O1"]));
    assert_eq!(current_car(&ledger, "V1").unwrap().owned_by, "Dealer9");
}

#[test]
fn test_register_car_is_permitted_from_any_state() {
    // RegisterCar does not require AssignedToDealer; a car still in the
    // factory can be registered directly.
    let (mut ledger, _) = memory_ledger();
    submit_ok(&mut ledger, &create_car("V1", "Red"));

    submit_ok(&mut ledger, &car("RegisterCar", registrar(), &["V1", "Alice", "P-1"]));
    let v1 = current_car(&ledger, "V1").unwrap();
    assert!(v1.status.is_registered());
    assert_eq!(v1.owned_by, "Alice");
}

// =============================================================================
// Store failures
// =============================================================================

#[test]
fn test_unavailable_store_aborts_without_writes() {
    let (mut ledger, medium) = memory_ledger();
    submit_ok(&mut ledger, &create_car("V1", "Red"));
    let bytes = medium.len();

    medium.set_available(false);
    let err = submit_err(&mut ledger, &create_car("V2", "Blue"));
    assert_kind(&err, LedgerErrorKind::StoreUnavailable);
    assert!(err.is_retryable());
    let err = ledger.evaluate(&car("ReadCar", registrar(), &["V1"])).unwrap_err();
    assert_kind(&err, LedgerErrorKind::StoreUnavailable);
    assert_eq!(medium.len(), bytes);

    medium.set_available(true);
    submit_ok(&mut ledger, &create_car("V2", "Blue"));
    assert_eq!(ledger.store().last_sequence(), 2);
}

#[test]
fn test_argument_errors() {
    let (mut ledger, _) = memory_ledger();
    let err = submit_err(&mut ledger, &car("CreateCar", factory(), &["V1", "Toyota"]));
    assert_kind(&err, LedgerErrorKind::InvalidArgument);
    assert!(err.message().contains("expects 6 argument(s), got 2"));

    let err = submit_err(&mut ledger, &call("TruckContract", "CreateTruck", factory(), &[]));
    assert_kind(&err, LedgerErrorKind::InvalidArgument);
    assert!(!err.is_retryable());
}

// =============================================================================
// Stored record checks
// =============================================================================

/// Ledger whose log holds a car stored under `V1` but claiming to be `V9`.
fn ledger_with_mislabelled_car() -> Ledger {
    let medium = MemoryMedium::new();
    {
        let mut store = StateStore::open(Box::new(medium.clone())).unwrap();
        let mislabelled = json!({
            "assetType": "car",
            "carId": "V9",
            "color": "Red",
            "dateOfManufacture": "2024-01-01",
            "make": "Toyota",
            "model": "Corolla",
            "ownedBy": "FactoryCo",
            "status": "InFactory"
        });
        let mut unit = UnitOfWork::new();
        unit.put(&Partition::public("vehicle"), "V1", serde_json::to_vec(&mislabelled).unwrap());
        store.commit(unit, "tx-mislabelled", at(0)).unwrap();
    }
    Ledger::open(Box::new(medium), Arc::new(AccessPolicy::default())).unwrap()
}

#[test]
fn test_list_results_apply_record_checks() {
    let ledger = ledger_with_mislabelled_car();

    let listings = [
        car("ReadCar", registrar(), &["V1"]),
        car("GetAllCars", registrar(), &[]),
        car("GetCarsByRange", registrar(), &["V1", ""]),
        car("QueryCars", registrar(), &[r#"{"selector":{"color":"Red"}}"#]),
        car("GetCarHistory", registrar(), &["V1"]),
    ];
    for inv in &listings {
        let err = ledger.evaluate(inv).unwrap_err();
        assert_kind(&err, LedgerErrorKind::MalformedData);
        assert!(err.message().contains("V9"), "{}", err.message());
    }
}
