//! Ledger engine
//!
//! Runs one operation at a time: resolve the contract, execute it against
//! committed state inside a unit of work, then commit the unit as a single
//! frame. Submission takes `&mut self`; evaluation takes `&self` and never
//! commits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::context::TxContext;
use super::errors::{LedgerErrorKind, LedgerResult};
use super::invocation::Invocation;
use super::txid::derive_tx_id;
use crate::access::AccessGate;
use crate::contracts::ContractRegistry;
use crate::observability::{
    log_event_with_fields, AuditAction, AuditLog, AuditOutcome, AuditRecord, Event, Logger,
};
use crate::storage::{Medium, StateStore, UnitOfWork};

/// Successful operation result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub tx_id: String,
    pub payload: Value,
    /// Commit sequence; `None` when nothing was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

/// The asset ledger engine
pub struct Ledger {
    store: StateStore,
    gate: Arc<dyn AccessGate>,
    contracts: ContractRegistry,
    audit: Option<Arc<dyn AuditLog>>,
}

impl Ledger {
    /// Opens the ledger over a medium, replaying its frame log.
    ///
    /// A corrupt or unreadable log halts startup.
    pub fn open(medium: Box<dyn Medium>, gate: Arc<dyn AccessGate>) -> LedgerResult<Self> {
        let location = medium.describe();
        log_event_with_fields(Event::RecoveryStart, &[("medium", &location)]);

        let store = match StateStore::open(medium) {
            Ok(store) => store,
            Err(e) => {
                log_event_with_fields(
                    Event::RecoveryFailed,
                    &[("medium", &location), ("code", e.code().code()), ("error", e.message())],
                );
                return Err(e.into());
            }
        };

        let last_sequence = store.last_sequence().to_string();
        log_event_with_fields(
            Event::RecoveryComplete,
            &[("medium", &location), ("last_sequence", &last_sequence)],
        );

        Ok(Self {
            store,
            gate,
            contracts: ContractRegistry::default(),
            audit: None,
        })
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Executes an operation and commits its writes atomically.
    pub fn submit(&mut self, invocation: &Invocation) -> LedgerResult<Response> {
        let (tx_id, timestamp) = stamp(invocation);

        let outcome = execute(
            &self.store,
            self.gate.as_ref(),
            &self.contracts,
            invocation,
            &tx_id,
            timestamp,
        );
        let result = match outcome {
            Ok((payload, unit)) => self
                .store
                .commit(unit, &tx_id, timestamp)
                .map(|receipt| Response {
                    tx_id: tx_id.clone(),
                    payload,
                    sequence: receipt.sequence,
                })
                .map_err(Into::into),
            Err(e) => Err(e),
        };

        self.report(AuditAction::Submit, invocation, &tx_id, &result);
        result
    }

    /// Executes an operation against committed state and discards its writes.
    pub fn evaluate(&self, invocation: &Invocation) -> LedgerResult<Response> {
        let (tx_id, timestamp) = stamp(invocation);

        let result = execute(
            &self.store,
            self.gate.as_ref(),
            &self.contracts,
            invocation,
            &tx_id,
            timestamp,
        )
        .map(|(payload, _discarded)| Response {
            tx_id: tx_id.clone(),
            payload,
            sequence: None,
        });

        self.report(AuditAction::Evaluate, invocation, &tx_id, &result);
        result
    }

    fn report(&self, action: AuditAction, invocation: &Invocation, tx_id: &str, result: &LedgerResult<Response>) {
        let org = invocation.identity.org_id.as_str();
        let fields = [
            ("tx_id", tx_id),
            ("contract", invocation.contract.as_str()),
            ("function", invocation.function.as_str()),
            ("org", org),
        ];

        let record = AuditRecord::new(action, AuditOutcome::Success, tx_id)
            .with_operation(invocation.contract.as_str(), invocation.function.as_str())
            .with_caller(org, invocation.identity.client_id.as_str());

        let record = match result {
            Ok(response) => {
                let sequence = response.sequence.map(|s| s.to_string()).unwrap_or_default();
                let event = match action {
                    AuditAction::Submit => Event::OperationCommitted,
                    AuditAction::Evaluate => Event::OperationEvaluated,
                };
                let mut logged = fields.to_vec();
                if !sequence.is_empty() {
                    logged.push(("sequence", sequence.as_str()));
                }
                log_event_with_fields(event, &logged);
                record.with_sequence(response.sequence)
            }
            Err(e) => {
                let (event, outcome) = match e.kind() {
                    LedgerErrorKind::Unauthorized => (Event::OperationRejected, AuditOutcome::Rejected),
                    _ => (Event::OperationFailed, AuditOutcome::Failed),
                };
                let mut logged = fields.to_vec();
                logged.push(("code", e.code()));
                logged.push(("error", e.message()));
                if e.kind() == LedgerErrorKind::StoreUnavailable {
                    Logger::error(event.as_str(), &logged);
                } else {
                    Logger::warn(event.as_str(), &logged);
                }
                AuditRecord {
                    outcome,
                    ..record
                }
                .with_error_code(e.code())
            }
        };

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.append(&record) {
                let message = e.to_string();
                Logger::warn("AUDIT_APPEND_FAILED", &[("tx_id", tx_id), ("error", &message)]);
            }
        }
    }
}

fn stamp(invocation: &Invocation) -> (String, DateTime<Utc>) {
    let tx_id = invocation
        .tx_id
        .clone()
        .unwrap_or_else(|| derive_tx_id(&invocation.identity));
    (tx_id, invocation.timestamp.unwrap_or_else(Utc::now))
}

/// Runs the contract function and hands back its payload and unit of work.
fn execute(
    store: &StateStore,
    gate: &dyn AccessGate,
    contracts: &ContractRegistry,
    invocation: &Invocation,
    tx_id: &str,
    timestamp: DateTime<Utc>,
) -> LedgerResult<(Value, UnitOfWork)> {
    let contract = contracts.get(&invocation.contract)?;
    let mut ctx = TxContext::new(
        store,
        gate,
        &invocation.identity,
        contract.namespace(),
        tx_id,
        timestamp,
        &invocation.transient,
    );
    let payload = contract.invoke(&mut ctx, &invocation.function, &invocation.args)?;
    Ok((payload, ctx.into_unit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessPolicy, Credential};
    use crate::observability::MemoryAuditLog;
    use crate::storage::MemoryMedium;

    fn ledger() -> (Ledger, MemoryAuditLog) {
        let audit = MemoryAuditLog::new();
        let ledger = Ledger::open(Box::new(MemoryMedium::new()), Arc::new(AccessPolicy::default()))
            .unwrap()
            .with_audit(Arc::new(audit.clone()));
        (ledger, audit)
    }

    fn create_car(id: &str) -> Invocation {
        Invocation::new("CarContract", "CreateCar", Credential::new("Factory", "factory-admin"))
            .args([id, "Toyota", "Corolla", "Red", "FactoryCo", "2024-01-01"])
    }

    #[test]
    fn test_submit_commits_and_audits() {
        let (mut ledger, audit) = ledger();
        let response = ledger.submit(&create_car("V1").with_tx_id("tx-1")).unwrap();
        assert_eq!(response.tx_id, "tx-1");
        assert_eq!(response.sequence, Some(1));

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, AuditOutcome::Success);
        assert_eq!(records[0].sequence, Some(1));
        assert_eq!(records[0].org, "Factory");
    }

    #[test]
    fn test_evaluate_never_commits() {
        let (ledger, audit) = ledger();
        let response = ledger.evaluate(&create_car("V1")).unwrap();
        assert_eq!(response.sequence, None);
        assert_eq!(response.tx_id.len(), 64);
        assert_eq!(ledger.store().last_sequence(), 0);
        assert_eq!(audit.records()[0].action, AuditAction::Evaluate);
    }

    #[test]
    fn test_rejection_is_audited() {
        let (mut ledger, audit) = ledger();
        let mut inv = create_car("V1");
        inv.identity = Credential::new("Dealer", "d1");

        let err = ledger.submit(&inv).unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::Unauthorized);
        assert_eq!(ledger.store().last_sequence(), 0);

        let record = &audit.records()[0];
        assert_eq!(record.outcome, AuditOutcome::Rejected);
        assert_eq!(record.error_code.as_deref(), Some("LEDGER_UNAUTHORIZED"));
    }

    #[test]
    fn test_unknown_contract_and_function() {
        let (mut ledger, audit) = ledger();
        let cred = Credential::new("Factory", "f1");

        let err = ledger.submit(&Invocation::new("Nope", "CreateCar", cred.clone())).unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::InvalidArgument);
        let err = ledger.submit(&Invocation::new("CarContract", "Fly", cred)).unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::InvalidArgument);
        assert!(audit.records().iter().all(|r| r.outcome == AuditOutcome::Failed));
    }

    #[test]
    fn test_read_only_submit_has_no_sequence() {
        let (mut ledger, _) = ledger();
        ledger.submit(&create_car("V1")).unwrap();
        let read = Invocation::new("CarContract", "ReadCar", Credential::new("Registrar", "r1")).arg("V1");
        let response = ledger.submit(&read).unwrap();
        assert_eq!(response.sequence, None);
        assert_eq!(response.payload["carId"], "V1");
        assert_eq!(ledger.store().last_sequence(), 1);
    }
}
