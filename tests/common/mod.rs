//! Shared fixtures for ledger integration tests

#![allow(dead_code)]

use std::sync::Arc;

use assetledger::access::{AccessPolicy, Credential};
use assetledger::ledger::{Invocation, Ledger, LedgerError, LedgerErrorKind, Response};
use assetledger::storage::MemoryMedium;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Ledger over an in-memory medium, plus a handle on that medium
pub fn memory_ledger() -> (Ledger, MemoryMedium) {
    let medium = MemoryMedium::new();
    let ledger = Ledger::open(Box::new(medium.clone()), Arc::new(AccessPolicy::default()))
        .expect("open ledger");
    (ledger, medium)
}

pub fn factory() -> Credential {
    Credential::new("Factory", "factory-admin")
}

pub fn dealer() -> Credential {
    Credential::new("Dealer", "dealer9-admin")
}

pub fn registrar() -> Credential {
    Credential::new("Registrar", "registrar-1")
}

pub fn farmer() -> Credential {
    Credential::new("Farmer", "farmer-ravi")
}

pub fn miller() -> Credential {
    Credential::new("Miller", "miller-1")
}

pub fn retailer() -> Credential {
    Credential::new("Retailer", "retailer-1")
}

/// Fixed commit time, `minute` minutes past 2024-01-01 00:00 UTC
pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
}

pub fn call(contract: &str, function: &str, who: Credential, args: &[&str]) -> Invocation {
    Invocation::new(contract, function, who).args(args.iter().copied())
}

pub fn car(function: &str, who: Credential, args: &[&str]) -> Invocation {
    call("CarContract", function, who, args)
}

pub fn create_car(id: &str, color: &str) -> Invocation {
    car(
        "CreateCar",
        factory(),
        &[id, "Toyota", "Corolla", color, "FactoryCo", "2024-01-01"],
    )
}

pub fn create_order(id: &str, color: &str, dealer_name: &str) -> Invocation {
    call("OrderContract", "CreateOrder", dealer(), &[id])
        .transient("make", "Toyota")
        .transient("model", "Corolla")
        .transient("color", color)
        .transient("dealerName", dealer_name)
}

pub fn add_batch(id: &str, location: &str, grade: &str) -> Invocation {
    call(
        "RiceContract",
        "AddRiceBatch",
        farmer(),
        &[id, "2024-02-01", "500", location, grade],
    )
}

pub fn submit_ok(ledger: &mut Ledger, inv: &Invocation) -> Response {
    match ledger.submit(inv) {
        Ok(response) => response,
        Err(e) => panic!("{}.{} failed: {}", inv.contract, inv.function, e),
    }
}

pub fn submit_err(ledger: &mut Ledger, inv: &Invocation) -> LedgerError {
    match ledger.submit(inv) {
        Ok(response) => panic!("{}.{} unexpectedly succeeded: {:?}", inv.contract, inv.function, response),
        Err(e) => e,
    }
}

pub fn read(ledger: &Ledger, inv: &Invocation) -> Value {
    match ledger.evaluate(inv) {
        Ok(response) => response.payload,
        Err(e) => panic!("{}.{} failed: {}", inv.contract, inv.function, e),
    }
}

pub fn assert_kind(err: &LedgerError, kind: LedgerErrorKind) {
    assert_eq!(err.kind(), kind, "unexpected error: {}", err);
}
